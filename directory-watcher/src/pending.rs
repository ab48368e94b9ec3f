//! In-memory set of files waiting to stabilize.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Files seen recently, keyed by path, with the instant of their last change.
///
/// Each method holds the lock for a single map operation only; callers open
/// and stat files without it.
#[derive(Debug, Default)]
pub struct PendingFiles {
    files: Mutex<HashMap<PathBuf, Instant>>,
}

impl PendingFiles {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Instant>> {
        // A panic elsewhere cannot leave the map half-updated.
        self.files.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record a change to `path` at `now`, restarting its quiet period.
    pub fn touch(&self, path: &Path, now: Instant) {
        let mut files = self.lock();
        let seen = files.entry(path.to_path_buf()).or_insert(now);
        *seen = (*seen).max(now);
    }

    /// Files whose quiet period at `now` is at least `window`.
    pub fn due(&self, now: Instant, window: Duration) -> Vec<(PathBuf, Instant)> {
        let files = self.lock();
        let mut due: Vec<_> = files
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) >= window)
            .map(|(path, seen)| (path.clone(), *seen))
            .collect();
        due.sort();
        due
    }

    /// Forget `path`.
    pub fn remove(&self, path: &Path) {
        self.lock().remove(path);
    }

    /// Forget `path` unless it changed again after `seen`.
    pub fn remove_if_unchanged(&self, path: &Path, seen: Instant) -> bool {
        let mut files = self.lock();
        match files.get(path) {
            Some(current) if *current <= seen => {
                files.remove(path);
                true
            }
            _ => false,
        }
    }

    /// Whether `path` is pending.
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// Number of pending files.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
