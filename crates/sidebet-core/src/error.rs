//! Error types for `Sidebet` core library.

use thiserror::Error;

/// Result type alias using `Sidebet` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Sidebet` operations.
///
/// The first four variants form the error taxonomy callers are expected to
/// branch on: validation failures are client-detectable and recoverable,
/// not-found means a referenced bet/group/user is missing, conflict means a
/// concurrent or out-of-order mutation was rejected, and transient I/O
/// failures are retryable.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete input, detected before any write.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutation rejected because it races or contradicts current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend/network failure; safe to retry the original gesture.
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::db::DatabaseError> for Error {
    fn from(e: crate::db::DatabaseError) -> Self {
        use crate::db::DatabaseError as Db;
        match e {
            Db::NotFound(msg) => Self::NotFound(msg),
            Db::Conflict(msg) => Self::Conflict(msg),
            other => Self::TransientIo(other.to_string()),
        }
    }
}
