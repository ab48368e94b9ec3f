//! Error types for the durable queue.

use thiserror::Error;

/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors that can occur in the durable queue.
#[derive(Error, Debug)]
pub enum QueueError {
    /// No entry exists for the path.
    #[error("queue entry not found: {0}")]
    NotFound(String),

    /// Queue keys must be valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(String),

    /// A stored row could not be decoded.
    #[error("corrupt queue entry for {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
