//! Error types for the agent.

use thiserror::Error;

/// Errors raised while loading or saving the agent configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key is missing or empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The file is not valid YAML for [`AgentConfig`](crate::AgentConfig).
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Serialization error.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a service backend.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service has not been installed.
    #[error("service {0} is not installed")]
    NotInstalled(String),

    /// A service manager command exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// No service location could be determined on this platform.
    #[error("cannot determine service location: {0}")]
    Location(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
