//! Drop-folder watcher with stability gating.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use docsync_queue::DurableQueue;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{IncludeMatcher, WatchConfig};
use crate::error::{Result, WatcherError};
use crate::event::FileEvent;
use crate::pending::PendingFiles;
use crate::readiness::{Readiness, ReadinessCheck, check_blocking, check_readiness_with};
use crate::scan::scan_existing;

/// Watches one folder and enqueues files once they are fully written.
///
/// Event intake and the stability checker run as separate tasks that share
/// the [`PendingFiles`] set. Cloning is cheap; clones share that set.
#[derive(Clone)]
pub struct Watcher {
    /// Canonical watch folder.
    root: PathBuf,

    /// Watch configuration.
    config: Arc<WatchConfig>,

    /// Compiled include patterns.
    matcher: Arc<IncludeMatcher>,

    /// Files waiting to stabilize.
    pending: Arc<PendingFiles>,

    /// Destination for stable files.
    queue: DurableQueue,

    /// Decides whether a quiet file is still held by a writer.
    readiness: ReadinessCheck,
}

impl Watcher {
    /// Create a watcher, creating the watch folder if it does not exist.
    ///
    /// Fails if the folder cannot be created or is not a directory, or if an
    /// include pattern is invalid.
    pub fn new(config: WatchConfig, queue: DurableQueue) -> Result<Self> {
        let matcher = IncludeMatcher::new(&config.include_patterns)?;

        let folder_unavailable = |source| WatcherError::FolderUnavailable {
            path: config.folder.display().to_string(),
            source,
        };
        std::fs::create_dir_all(&config.folder).map_err(folder_unavailable)?;
        let root = std::fs::canonicalize(&config.folder).map_err(folder_unavailable)?;
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root.display().to_string()));
        }

        Ok(Self {
            root,
            config: Arc::new(config),
            matcher: Arc::new(matcher),
            pending: Arc::new(PendingFiles::new()),
            queue,
            readiness: check_blocking,
        })
    }

    /// Replace the platform readiness check.
    pub fn with_readiness_check(mut self, check: ReadinessCheck) -> Self {
        self.readiness = check;
        self
    }

    /// Canonical path of the watched folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files still waiting to stabilize.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Run until `cancel` fires.
    ///
    /// Seeds the pending set from the folder's current contents, then runs
    /// event intake here and the stability checker on its own task.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel::<FileEvent>(1000);

        let mut watcher: RecommendedWatcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for file_event in FileEvent::from_notify(event) {
                        if let Err(e) = event_tx.blocking_send(file_event) {
                            debug!("Dropping file event after shutdown: {e}");
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;
        watcher.watch(&self.root, RecursiveMode::NonRecursive)?;

        info!(folder = %self.root.display(), "Watching folder for new files");

        self.seed_from_scan();

        let checker = self.clone();
        let checker_cancel = cancel.clone();
        let checker_task =
            tokio::spawn(async move { checker.run_stability_checker(checker_cancel).await });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = event_rx.recv() => match event {
                    Some(event) => self.record_event(&event),
                    None => {
                        warn!("File event channel closed");
                        break;
                    }
                },
            }
        }

        drop(watcher);
        if let Err(e) = checker_task.await {
            error!("Stability checker task failed: {e}");
        }
        info!("Directory watcher stopped");
        Ok(())
    }

    /// Seed the pending set with matching files already in the folder.
    pub fn seed_from_scan(&self) -> usize {
        let now = Instant::now();
        let found = scan_existing(&self.root, &self.matcher);
        for path in &found {
            self.pending.touch(path, now);
        }
        found.len()
    }

    /// Apply one filesystem event to the pending set.
    ///
    /// Only create/write events for matching files count; anything else is
    /// ignored.
    pub fn record_event(&self, event: &FileEvent) {
        if !event.kind.is_write() || !self.matcher.matches(&event.path) {
            return;
        }

        debug!(file = %event.path.display(), kind = ?event.kind, "File event");
        self.pending.touch(&event.path, Instant::now());
    }

    async fn run_stability_checker(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_pending().await;
                }
            }
        }
    }

    /// Promote every pending file that has been quiet long enough.
    pub async fn check_pending(&self) -> usize {
        self.check_pending_at(Instant::now()).await
    }

    /// [`check_pending`](Self::check_pending) with an explicit clock.
    ///
    /// Returns the number of files enqueued.
    pub async fn check_pending_at(&self, now: Instant) -> usize {
        let mut enqueued = 0;

        for (path, seen) in self.pending.due(now, self.config.stability_window) {
            match check_readiness_with(&path, self.readiness).await {
                Readiness::Ready => {}
                Readiness::Busy => {
                    debug!(file = %path.display(), "File still busy");
                    self.pending.touch(&path, now);
                    continue;
                }
                Readiness::Missing => {
                    debug!(file = %path.display(), "File withdrawn before it stabilized");
                    self.pending.remove(&path);
                    continue;
                }
            }

            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(file = %path.display(), "File no longer exists: {e}");
                    self.pending.remove(&path);
                    continue;
                }
            };
            if !metadata.is_file() {
                self.pending.remove(&path);
                continue;
            }

            if let Err(e) = self.queue.enqueue(&path, metadata.len()).await {
                error!(file = %path.display(), "Failed to enqueue file: {e}");
                continue;
            }

            info!(file = %path.display(), size = metadata.len(), "File queued for upload");
            self.pending.remove_if_unchanged(&path, seen);
            enqueued += 1;
        }

        enqueued
    }
}
