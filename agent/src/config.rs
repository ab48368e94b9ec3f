//! Agent configuration.
//!
//! Loaded once from YAML at startup and immutable for the lifetime of the
//! process. Missing keys take their defaults; a missing file is treated as an
//! empty one so that validation still reports what is required.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_DMS_URL: &str = "https://portal.personalmappe.cloud";
pub const DEFAULT_STABILITY_SECONDS: i64 = 5;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: i64 = 300;
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Settings read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the ingest service.
    pub dms_url: String,

    /// Folder to watch. Required.
    pub watch_folder: PathBuf,

    /// Where delivered files are moved. Empty leaves them in place.
    pub processed_folder: PathBuf,

    /// Shell globs matched case-insensitively against file names.
    pub include_patterns: Vec<String>,

    /// Queue database. Empty means the platform default.
    pub queue_path: PathBuf,

    /// Log directory. Empty means the platform default.
    pub log_path: PathBuf,

    pub stability_seconds: i64,
    pub heartbeat_interval_seconds: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dms_url: DEFAULT_DMS_URL.to_string(),
            watch_folder: PathBuf::new(),
            processed_folder: PathBuf::new(),
            include_patterns: default_patterns(),
            queue_path: PathBuf::new(),
            log_path: PathBuf::new(),
            stability_seconds: DEFAULT_STABILITY_SECONDS,
            heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
        }
    }
}

fn default_patterns() -> Vec<String> {
    ["*.pdf", "*.xlsx", "*.docx"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl AgentConfig {
    /// Load and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::parse(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Apply fallbacks for empty or non-positive values.
    pub fn normalized(mut self) -> Self {
        self.dms_url = self.dms_url.trim().trim_end_matches('/').to_string();
        if self.include_patterns.is_empty() {
            self.include_patterns = default_patterns();
        }
        if self.stability_seconds <= 0 {
            self.stability_seconds = DEFAULT_STABILITY_SECONDS;
        }
        if self.heartbeat_interval_seconds <= 0 {
            self.heartbeat_interval_seconds = DEFAULT_HEARTBEAT_INTERVAL_SECONDS;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_folder.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("watch_folder"));
        }
        if self.dms_url.is_empty() {
            return Err(ConfigError::MissingField("dms_url"));
        }
        Ok(())
    }

    /// Resolve every configured relative path against the current directory.
    pub fn with_absolute_paths(mut self) -> Result<Self, ConfigError> {
        for path in [
            &mut self.watch_folder,
            &mut self.processed_folder,
            &mut self.queue_path,
            &mut self.log_path,
        ] {
            if !path.as_os_str().is_empty() && path.is_relative() {
                *path = std::path::absolute(&*path)?;
            }
        }
        Ok(self)
    }

    /// Load `path` for a service install.
    ///
    /// The service does not start in the caller's working directory, so
    /// relative paths are resolved now and the result is written back to
    /// `path` when anything changed.
    pub fn materialize(path: &Path) -> Result<Self, ConfigError> {
        let loaded = Self::load(path)?;
        let resolved = loaded.clone().with_absolute_paths()?;
        if resolved != loaded {
            resolved.save(path)?;
        }
        Ok(resolved)
    }

    /// Write the config as YAML, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("yaml.tmp");
        std::fs::write(&temp_path, yaml)?;
        std::fs::rename(&temp_path, path)?;

        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn stability_window(&self) -> Duration {
        Duration::from_secs(self.stability_seconds.max(1).unsigned_abs())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        docsync_uploader::heartbeat_interval(self.heartbeat_interval_seconds)
    }

    pub fn queue_path(&self) -> PathBuf {
        if self.queue_path.as_os_str().is_empty() {
            docsync_queue::default_queue_path()
        } else {
            self.queue_path.clone()
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        if self.log_path.as_os_str().is_empty() {
            default_log_dir()
        } else {
            self.log_path.clone()
        }
    }

    /// Processed folder, if relocation is enabled.
    pub fn processed_folder(&self) -> Option<&Path> {
        Some(self.processed_folder.as_path()).filter(|p| !p.as_os_str().is_empty())
    }
}

/// `logs` inside the shared data directory that also holds the queue.
pub fn default_log_dir() -> PathBuf {
    docsync_queue::default_data_dir().join("logs")
}

/// `config.yaml` next to the running executable.
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
