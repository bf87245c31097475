//! The uniform result shape exposed to the UI/API layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GameError;

/// What every exposed operation returns: `{ success, error?, data? }`.
///
/// `data` carries the private payload for the requesting player only (their
/// dealt role, a night-action result, the computed outcome). Broadcastable
/// state travels through the store's subscribable paths instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionReply {
    /// A bare success with no payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    /// A success carrying a private payload.
    pub fn with_data(data: Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    /// A structured failure.
    pub fn err(e: &GameError) -> Self {
        Self {
            success: false,
            error: Some(e.to_string()),
            data: None,
        }
    }
}

impl From<Result<Option<Value>, GameError>> for ActionReply {
    fn from(result: Result<Option<Value>, GameError>) -> Self {
        match result {
            Ok(Some(data)) => Self::with_data(data),
            Ok(None) => Self::ok(),
            Err(e) => Self::err(&e),
        }
    }
}
