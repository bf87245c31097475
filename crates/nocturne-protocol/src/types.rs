//! Identity newtypes.
//!
//! Both ids are opaque strings supplied by collaborators: room ids come from
//! the room-creation flow, player ids from the anonymous identity provider.
//! The engine never inspects their contents — it only compares, hashes, and
//! embeds them in store paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a player.
///
/// Newtype wrapper so a player id can never be passed where a room id is
/// expected. `#[serde(transparent)]` keeps the JSON representation a plain
/// string, which is what the store paths and client SDK expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Borrows the raw id for use in store paths.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A unique identifier for a room (one table of the game).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Borrows the raw id for use in store paths.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
