//! launchd LaunchAgent.

use std::path::PathBuf;

use tracing::{info, warn};

use super::{ServiceDefinition, ServiceRuntime, ServiceStatus, run_command};
use crate::error::ServiceError;

const LABEL_PREFIX: &str = "cloud.personalmappe";

pub struct LaunchdService {
    definition: ServiceDefinition,
    agents_dir: PathBuf,
}

impl LaunchdService {
    /// Install into `~/Library/LaunchAgents`.
    pub fn new(definition: ServiceDefinition) -> Result<Self, ServiceError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ServiceError::Location("no home directory".to_string()))?;
        Ok(Self::with_agents_dir(
            definition,
            home.join("Library").join("LaunchAgents"),
        ))
    }

    pub fn with_agents_dir(definition: ServiceDefinition, agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            definition,
            agents_dir: agents_dir.into(),
        }
    }

    pub fn label(&self) -> String {
        format!("{LABEL_PREFIX}.{}", self.definition.name)
    }

    pub fn plist_path(&self) -> PathBuf {
        self.agents_dir.join(format!("{}.plist", self.label()))
    }

    pub fn render_plist(&self) -> String {
        let def = &self.definition;
        let arguments: String = std::iter::once(def.executable.display().to_string())
            .chain(def.arguments())
            .map(|arg| format!("        <string>{}</string>\n", escape_xml(&arg)))
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{arguments}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <dict>
        <key>SuccessfulExit</key>
        <false/>
    </dict>
</dict>
</plist>
"#,
            label = escape_xml(&self.label()),
        )
    }

    fn ensure_installed(&self) -> Result<(), ServiceError> {
        if self.plist_path().exists() {
            Ok(())
        } else {
            Err(ServiceError::NotInstalled(self.definition.name.clone()))
        }
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl ServiceRuntime for LaunchdService {
    fn name(&self) -> &str {
        "launchd"
    }

    fn install(&self) -> Result<(), ServiceError> {
        std::fs::create_dir_all(&self.agents_dir)?;
        std::fs::write(self.plist_path(), self.render_plist())?;
        info!(plist = %self.plist_path().display(), "Installed launch agent");
        Ok(())
    }

    fn uninstall(&self) -> Result<(), ServiceError> {
        self.ensure_installed()?;
        if let Err(e) = self.stop() {
            warn!("Stopping service before uninstall failed: {e}");
        }
        std::fs::remove_file(self.plist_path())?;
        Ok(())
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.ensure_installed()?;
        let plist = self.plist_path().display().to_string();
        run_command("launchctl", &["load", "-w", &plist]).map(|_| ())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.ensure_installed()?;
        let plist = self.plist_path().display().to_string();
        run_command("launchctl", &["unload", &plist]).map(|_| ())
    }

    fn status(&self) -> Result<ServiceStatus, ServiceError> {
        self.ensure_installed()?;
        match run_command("launchctl", &["list", &self.label()]) {
            Ok(listing) => Ok(parse_list(&listing)),
            // Not loaded.
            Err(ServiceError::Command { .. }) => Ok(ServiceStatus::Stopped),
            Err(e) => Err(e),
        }
    }
}

/// Interpret `launchctl list <label>`: a loaded job with a PID is running.
fn parse_list(listing: &str) -> ServiceStatus {
    if listing.contains("\"PID\" =") {
        ServiceStatus::Running
    } else {
        ServiceStatus::Stopped
    }
}
