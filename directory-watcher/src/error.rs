//! Error types for the directory watcher.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Watch folder could not be created or opened.
    #[error("watch folder unavailable: {path}: {source}")]
    FolderUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Watch folder exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Invalid include pattern.
    #[error("invalid include pattern: {0}")]
    InvalidPattern(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue error.
    #[error("queue error: {0}")]
    Queue(#[from] docsync_queue::QueueError),
}
