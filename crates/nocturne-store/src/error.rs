//! Error types for the store layer.

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path is syntactically invalid (empty, or has empty segments).
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// A path segment descends into a value that is not an object.
    #[error("not an object at {0}")]
    NotAnObject(String),

    /// The backing store failed (network loss, backend error). The engine
    /// surfaces this as a generic I/O failure to the caller.
    #[error("backend failure: {0}")]
    Backend(String),
}
