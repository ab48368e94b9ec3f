//! Queue entries.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// A file waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Absolute path of the file; the queue key.
    pub path: PathBuf,

    /// File size in bytes when it was enqueued.
    pub size: u64,

    /// When the file was (last) enqueued.
    pub queued_at: DateTime<Utc>,

    /// Consecutive failed delivery attempts.
    pub retries: u32,

    /// Error text from the most recent failure.
    pub last_error: Option<String>,

    /// Earliest time the entry may be dequeued again.
    pub next_retry: DateTime<Utc>,
}

impl QueueEntry {
    /// Whether the entry may be handed out at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_retry <= now
    }
}

/// Row layout of the `pending_files` table. Times are Unix milliseconds.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub path: String,
    pub size: i64,
    pub queued_at: i64,
    pub retries: i64,
    pub last_error: Option<String>,
    pub next_retry: i64,
}

impl TryFrom<EntryRow> for QueueEntry {
    type Error = QueueError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: &str| QueueError::Corrupt {
            path: row.path.clone(),
            reason: reason.to_string(),
        };

        let queued_at =
            DateTime::from_timestamp_millis(row.queued_at).ok_or_else(|| corrupt("queued_at"))?;
        let next_retry =
            DateTime::from_timestamp_millis(row.next_retry).ok_or_else(|| corrupt("next_retry"))?;
        let size = u64::try_from(row.size).map_err(|_| corrupt("negative size"))?;
        let retries = u32::try_from(row.retries).map_err(|_| corrupt("retries out of range"))?;

        Ok(Self {
            path: PathBuf::from(row.path),
            size,
            queued_at,
            retries,
            last_error: row.last_error,
            next_retry,
        })
    }
}
