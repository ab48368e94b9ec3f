//! Error types for the uploader.

use thiserror::Error;

/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that can occur while delivering a file.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The server answered with a status other than 2xx or 409.
    #[error("upload failed with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Invalid endpoint configuration.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// HTTP error.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue error.
    #[error("queue error: {0}")]
    Queue(#[from] docsync_queue::QueueError),
}
