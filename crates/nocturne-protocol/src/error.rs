//! The shared error taxonomy.
//!
//! Every operation the core exposes fails with one of these variants. They
//! are returned as structured values to the caller — a bad client request
//! must never take the host process down.

/// Errors returned by game operations.
///
/// The messages are short, stable strings; several of them double as the
/// machine-readable refusal codes the UI layer switches on (for example
/// `room_not_found` and `in_progress` from a join attempt).
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The requester is not allowed to perform this operation
    /// (not the host, or not a member of the room).
    #[error("{0}")]
    Authorization(String),

    /// Wrong phase, wrong role, or the requester already acted.
    /// Produces no side effects — a retried request lands here harmlessly.
    #[error("{0}")]
    TurnOrder(String),

    /// The request itself is malformed: bad target, role-count mismatch,
    /// missing required werewolf, and so on.
    #[error("{0}")]
    Validation(String),

    /// The room or player does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation is valid in general but not for the room's current
    /// status (e.g., voting before the day ends).
    #[error("{0}")]
    StateConflict(String),

    /// An unrecoverable store failure. The caller owns retry/backoff —
    /// the core performs no automatic retries that could double-apply
    /// a mutation.
    #[error("store failure: {0}")]
    Io(String),
}

impl GameError {
    /// The taxonomy tag for this error, independent of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authorization(_) => "authorization",
            Self::TurnOrder(_) => "turn_order",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::StateConflict(_) => "state_conflict",
            Self::Io(_) => "io",
        }
    }

    /// Shorthand for the structured refusal a join attempt gets when the
    /// room does not exist.
    pub fn room_not_found() -> Self {
        Self::NotFound("room_not_found".into())
    }

    /// Shorthand for the structured refusal a new player gets while a game
    /// is running.
    pub fn in_progress() -> Self {
        Self::StateConflict("in_progress".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_codes_are_bare_strings() {
        // The UI layer matches on these exact strings.
        assert_eq!(GameError::room_not_found().to_string(), "room_not_found");
        assert_eq!(GameError::in_progress().to_string(), "in_progress");
    }

    #[test]
    fn test_kind_tags_cover_the_taxonomy() {
        assert_eq!(GameError::Authorization("x".into()).kind(), "authorization");
        assert_eq!(GameError::TurnOrder("x".into()).kind(), "turn_order");
        assert_eq!(GameError::Validation("x".into()).kind(), "validation");
        assert_eq!(GameError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(GameError::StateConflict("x".into()).kind(), "state_conflict");
        assert_eq!(GameError::Io("x".into()).kind(), "io");
    }
}
