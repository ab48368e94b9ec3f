//! Error types for credential storage.

use thiserror::Error;

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors that can occur while storing or reading the token.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No token was ever stored, or the stored token is empty.
    #[error("no API token configured")]
    NotConfigured,

    /// Refused to store an empty token.
    #[error("refusing to store an empty token")]
    EmptySecret,

    /// The platform vault rejected the operation.
    #[error("credential vault error: {0}")]
    Vault(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
