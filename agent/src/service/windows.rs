//! Windows Task Scheduler task that starts the agent at boot.

use tracing::{info, warn};

use super::{ServiceDefinition, ServiceRuntime, ServiceStatus, run_command};
use crate::error::ServiceError;

const SCHTASKS: &str = "schtasks";

pub struct WindowsService {
    definition: ServiceDefinition,
}

impl WindowsService {
    pub fn new(definition: ServiceDefinition) -> Self {
        Self { definition }
    }

    /// The `/TR` value: quoted executable followed by its arguments.
    pub fn task_command(&self) -> String {
        let def = &self.definition;
        std::iter::once(def.executable.display().to_string())
            .chain(def.arguments())
            .map(|arg| format!("\"{arg}\""))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn create_args(&self) -> Vec<String> {
        let command = self.task_command();
        [
            "/Create",
            "/TN",
            self.definition.name.as_str(),
            "/TR",
            command.as_str(),
            "/SC",
            "ONSTART",
            "/RU",
            "SYSTEM",
            "/RL",
            "HIGHEST",
            "/F",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn schtasks(&self, verb: &str) -> Result<String, ServiceError> {
        run_command(SCHTASKS, &[verb, "/TN", &self.definition.name])
    }

    fn query(&self) -> Result<String, ServiceError> {
        match run_command(
            SCHTASKS,
            &["/Query", "/TN", &self.definition.name, "/FO", "LIST"],
        ) {
            Err(ServiceError::Command { .. }) => {
                Err(ServiceError::NotInstalled(self.definition.name.clone()))
            }
            other => other,
        }
    }
}

impl ServiceRuntime for WindowsService {
    fn name(&self) -> &str {
        "Task Scheduler"
    }

    fn install(&self) -> Result<(), ServiceError> {
        let args = self.create_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_command(SCHTASKS, &args)?;
        info!(task = %self.definition.name, "Installed scheduled task");
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        self.query()?;
        if let Err(e) = self.stop() {
            warn!("Stopping service before uninstall failed: {e}");
        }
        run_command(SCHTASKS, &["/Delete", "/TN", &self.definition.name, "/F"]).map(|_| ())
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.query()?;
        self.schtasks("/Run").map(|_| ())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.query()?;
        self.schtasks("/End").map(|_| ())
    }

    fn status(&self) -> Result<ServiceStatus, ServiceError> {
        Ok(parse_query(&self.query()?))
    }
}

/// Interpret the `Status:` line of `schtasks /Query /FO LIST`.
fn parse_query(listing: &str) -> ServiceStatus {
    let status = listing
        .lines()
        .find_map(|line| line.trim().strip_prefix("Status:"))
        .map(str::trim)
        .unwrap_or_default();

    match status {
        "Running" => ServiceStatus::Running,
        "Ready" | "Disabled" => ServiceStatus::Stopped,
        other => ServiceStatus::Unknown(other.to_string()),
    }
}
