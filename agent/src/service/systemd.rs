//! systemd user unit.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{ServiceDefinition, ServiceRuntime, ServiceStatus, run_command};
use crate::error::ServiceError;

pub struct SystemdService {
    definition: ServiceDefinition,
    unit_dir: PathBuf,
}

impl SystemdService {
    /// Install into `~/.config/systemd/user`.
    pub fn new(definition: ServiceDefinition) -> Result<Self, ServiceError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ServiceError::Location("no user config directory".to_string()))?;
        Ok(Self::with_unit_dir(
            definition,
            config_dir.join("systemd").join("user"),
        ))
    }

    pub fn with_unit_dir(definition: ServiceDefinition, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            definition,
            unit_dir: unit_dir.into(),
        }
    }

    fn unit_name(&self) -> String {
        format!("{}.service", self.definition.name)
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(self.unit_name())
    }

    pub fn render_unit(&self) -> String {
        let def = &self.definition;
        let exec = std::iter::once(def.executable.display().to_string())
            .chain(def.arguments())
            .map(|arg| quote(&arg))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "[Unit]\n\
             Description={description}\n\
             After=network-online.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec}\n\
             Restart=on-failure\n\
             RestartSec=10\n\
             \n\
             [Install]\n\
             WantedBy=default.target\n",
            description = def.description,
        )
    }

    fn systemctl(&self, verb: &str) -> Result<String, ServiceError> {
        let unit = self.unit_name();
        run_command("systemctl", &["--user", verb, &unit])
    }

    fn ensure_installed(&self) -> Result<(), ServiceError> {
        if self.unit_path().exists() {
            Ok(())
        } else {
            Err(ServiceError::NotInstalled(self.definition.name.clone()))
        }
    }
}

/// Quote an `ExecStart` word if it contains whitespace.
fn quote(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

impl ServiceRuntime for SystemdService {
    fn name(&self) -> &str {
        "systemd"
    }

    fn install(&self) -> Result<(), ServiceError> {
        std::fs::create_dir_all(&self.unit_dir)?;
        std::fs::write(self.unit_path(), self.render_unit())?;
        run_command("systemctl", &["--user", "daemon-reload"])?;
        self.systemctl("enable")?;
        info!(unit = %self.unit_path().display(), "Installed systemd user unit");
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        self.ensure_installed()?;
        if let Err(e) = self.stop() {
            warn!("Stopping service before uninstall failed: {e}");
        }
        if let Err(e) = self.systemctl("disable") {
            warn!("Disabling service failed: {e}");
        }
        remove_if_present(&self.unit_path())?;
        run_command("systemctl", &["--user", "daemon-reload"])?;
        Ok(())
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.ensure_installed()?;
        self.systemctl("start").map(|_| ())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.ensure_installed()?;
        self.systemctl("stop").map(|_| ())
    }

    fn status(&self) -> Result<ServiceStatus, ServiceError> {
        self.ensure_installed()?;
        // `is-active` exits non-zero for anything but "active"; only stdout matters.
        let unit = self.unit_name();
        let output = std::process::Command::new("systemctl")
            .args(["--user", "is-active", &unit])
            .output()?;
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(parse_is_active(&state))
    }
}

fn parse_is_active(output: &str) -> ServiceStatus {
    match output.trim() {
        "active" => ServiceStatus::Running,
        "inactive" | "failed" => ServiceStatus::Stopped,
        other => ServiceStatus::Unknown(other.to_string()),
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
