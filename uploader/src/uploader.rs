//! Queue-draining delivery loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use docsync_queue::DurableQueue;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{IngestClient, IngestOutcome};
use crate::digest::sha256_file;
use crate::error::Result;
use crate::relocate::relocate_to_processed;

/// Default delay between queue polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The server holds the file; the entry is gone from the queue.
    Delivered(IngestOutcome),

    /// The attempt failed and the entry was pushed along the backoff ladder.
    Failed { retries: u32, error: String },
}

/// One processed queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub path: PathBuf,
    pub outcome: DeliveryOutcome,

    /// Where the file went after delivery, if it was moved.
    pub relocated_to: Option<PathBuf>,
}

/// Drains the queue one entry per tick.
pub struct Uploader {
    queue: DurableQueue,
    client: IngestClient,
    processed_folder: Option<PathBuf>,
    poll_interval: Duration,
}

impl Uploader {
    pub fn new(queue: DurableQueue, client: IngestClient) -> Self {
        Self {
            queue,
            client,
            processed_folder: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Move delivered files into `folder`. An empty path disables relocation.
    pub fn with_processed_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        self.processed_folder = (!folder.as_os_str().is_empty()).then_some(folder);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until `cancel` fires. An upload in flight is finished first.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(endpoint = self.client.endpoint(), "Uploader started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.process_next().await {
                        error!("Failed to process queue: {e}");
                    }
                }
            }
        }
        info!("Uploader stopped");
    }

    /// Deliver the next due entry, if any.
    pub async fn process_next(&self) -> Result<Option<Delivery>> {
        self.process_next_at(Utc::now()).await
    }

    /// [`process_next`](Self::process_next) with an explicit clock for the
    /// queue.
    ///
    /// `now` selects the due entry. A failure is stamped at the later of `now`
    /// and the wall clock once the attempt has ended, so the backoff counts
    /// from the failure rather than from the dequeue.
    pub async fn process_next_at(&self, now: DateTime<Utc>) -> Result<Option<Delivery>> {
        let Some(entry) = self.queue.dequeue_at(now).await? else {
            return Ok(None);
        };

        debug!(file = %entry.path.display(), retries = entry.retries, "Uploading file");

        match self.deliver(&entry.path).await {
            Ok(outcome) => {
                self.queue.mark_complete(&entry.path).await?;
                info!(file = %entry.path.display(), ?outcome, "File uploaded successfully");

                let relocated_to = self.relocate(&entry.path).await;
                Ok(Some(Delivery {
                    path: entry.path,
                    outcome: DeliveryOutcome::Delivered(outcome),
                    relocated_to,
                }))
            }
            Err(e) => {
                let message = e.to_string();
                let failed_at = Utc::now().max(now);
                let failed = self
                    .queue
                    .mark_failed_at(&entry.path, &message, failed_at)
                    .await?;
                Ok(Some(Delivery {
                    path: entry.path,
                    outcome: DeliveryOutcome::Failed {
                        retries: failed.retries,
                        error: message,
                    },
                    relocated_to: None,
                }))
            }
        }
    }

    async fn deliver(&self, path: &Path) -> Result<IngestOutcome> {
        let digest = sha256_file(path).await?;
        self.client.upload_document(path, &digest).await
    }

    async fn relocate(&self, path: &Path) -> Option<PathBuf> {
        match relocate_to_processed(path, self.processed_folder.as_deref()).await {
            Ok(Some(destination)) => {
                debug!(
                    file = %path.display(),
                    to = %destination.display(),
                    "Moved file to processed folder"
                );
                Some(destination)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(file = %path.display(), "Failed to move file to processed folder: {e}");
                None
            }
        }
    }
}
