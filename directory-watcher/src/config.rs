//! Configuration types for the drop-folder watcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Quiet period used when none (or zero) is configured.
pub const DEFAULT_STABILITY_WINDOW: Duration = Duration::from_secs(5);

/// How often pending files are re-checked.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for the watched drop folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Folder to watch. Only its direct children are considered.
    pub folder: PathBuf,

    /// Glob patterns matched against file names (case-insensitive).
    pub include_patterns: Vec<String>,

    /// Minimum quiet period before a file is considered fully written.
    pub stability_window: Duration,

    /// Tick of the stability checker.
    pub check_interval: Duration,
}

impl WatchConfig {
    /// Create a new watch config with default patterns and timings.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            include_patterns: Self::default_patterns(),
            stability_window: DEFAULT_STABILITY_WINDOW,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Replace the include patterns. An empty list keeps the defaults.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        if !patterns.is_empty() {
            self.include_patterns = patterns;
        }
        self
    }

    /// Set the stability window. Zero falls back to the default.
    pub fn with_stability_window(mut self, window: Duration) -> Self {
        self.stability_window = if window.is_zero() {
            DEFAULT_STABILITY_WINDOW
        } else {
            window
        };
        self
    }

    /// Set the stability check interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.check_interval = interval;
        }
        self
    }

    /// Get default include patterns.
    pub fn default_patterns() -> Vec<String> {
        vec![
            "*.pdf".to_string(),
            "*.xlsx".to_string(),
            "*.docx".to_string(),
        ]
    }
}

/// Compiled include patterns.
#[derive(Debug, Clone)]
pub struct IncludeMatcher {
    patterns: Vec<Pattern>,
}

impl IncludeMatcher {
    /// Compile `patterns`, failing on the first invalid one.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| WatcherError::InvalidPattern(format!("{p}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Check whether the file name of `path` matches any include pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(name, options))
    }
}
