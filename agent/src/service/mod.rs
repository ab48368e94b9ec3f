//! OS service integration.
//!
//! Each backend is a thin adapter over the platform's service manager. They
//! all register the same command line, `docsync run --config <path>`, and
//! are selected at runtime by [`platform_service`].

mod launchd;
mod systemd;
mod windows;

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::ServiceError;

pub use launchd::LaunchdService;
pub use systemd::SystemdService;
pub use windows::WindowsService;

/// Service name registered with the OS.
pub const SERVICE_NAME: &str = "docsync-agent";

/// Observed service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    Unknown(String),
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Running => write!(f, "Running"),
            ServiceStatus::Stopped => write!(f, "Stopped"),
            ServiceStatus::Unknown(detail) => write!(f, "Unknown ({detail})"),
        }
    }
}

/// Lifecycle operations on the installed agent.
pub trait ServiceRuntime {
    /// Backend name, for messages.
    fn name(&self) -> &str;

    fn install(&self) -> Result<(), ServiceError>;

    /// Stop (ignoring errors) and unregister.
    fn uninstall(&self) -> Result<(), ServiceError>;

    fn start(&self) -> Result<(), ServiceError>;

    fn stop(&self) -> Result<(), ServiceError>;

    fn status(&self) -> Result<ServiceStatus, ServiceError>;
}

/// What gets registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,

    /// Absolute path of the `docsync` binary.
    pub executable: PathBuf,

    /// Absolute path of the config file passed to `run`.
    pub config_path: PathBuf,
}

impl ServiceDefinition {
    pub fn new(executable: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            name: SERVICE_NAME.to_string(),
            display_name: "Docsync Agent".to_string(),
            description: "Syncs documents from a local folder to the document management system"
                .to_string(),
            executable: executable.into(),
            config_path: config_path.into(),
        }
    }

    /// Arguments following the executable.
    pub fn arguments(&self) -> Vec<String> {
        vec![
            "run".to_string(),
            "--config".to_string(),
            self.config_path.display().to_string(),
        ]
    }
}

/// Backend for the current platform.
pub fn platform_service(
    definition: ServiceDefinition,
) -> Result<Box<dyn ServiceRuntime>, ServiceError> {
    if cfg!(windows) {
        Ok(Box::new(WindowsService::new(definition)))
    } else if cfg!(target_os = "macos") {
        Ok(Box::new(LaunchdService::new(definition)?))
    } else {
        Ok(Box::new(SystemdService::new(definition)?))
    }
}

/// Run a service manager command and return its stdout.
pub(crate) fn run_command(program: &str, args: &[&str]) -> Result<String, ServiceError> {
    let rendered = format!("{program} {}", args.join(" "));
    debug!(command = %rendered, "Running service command");

    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(ServiceError::Command {
            command: rendered,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
