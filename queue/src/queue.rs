//! SQLite-backed durable queue.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::backoff::backoff_for;
use crate::default_queue_path;
use crate::entry::{EntryRow, QueueEntry};
use crate::error::{QueueError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_files (
    path       TEXT    PRIMARY KEY NOT NULL,
    size       INTEGER NOT NULL,
    queued_at  INTEGER NOT NULL,
    retries    INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    next_retry INTEGER NOT NULL
)
"#;

/// Crash-durable queue of files awaiting upload.
///
/// Every operation is a single SQLite transaction on a WAL-journaled database
/// opened with `synchronous=FULL`, so a committed enqueue survives a crash.
#[derive(Clone)]
pub struct DurableQueue {
    pool: SqlitePool,
    path: PathBuf,
}

impl DurableQueue {
    /// Open (or create) the queue database at `path`.
    ///
    /// An empty path resolves to [`default_queue_path`].
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = if path.as_os_str().is_empty() {
            default_queue_path()
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));

        // One connection: the queue has a single writer and a single consumer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        info!(path = %path.display(), "Queue opened");
        Ok(Self { pool, path })
    }

    /// Location of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite the entry for `path`, due immediately.
    pub async fn enqueue(&self, path: &Path, size: u64) -> Result<()> {
        self.enqueue_at(path, size, Utc::now()).await
    }

    /// [`enqueue`](Self::enqueue) with an explicit clock.
    ///
    /// Re-enqueuing an existing path resets its retry count and error.
    pub async fn enqueue_at(&self, path: &Path, size: u64, now: DateTime<Utc>) -> Result<()> {
        let key = key_for(path)?;
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let now = now.timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO pending_files (path, size, queued_at, retries, last_error, next_retry)
            VALUES (?, ?, ?, 0, NULL, ?)
            ON CONFLICT(path) DO UPDATE SET
                size = excluded.size,
                queued_at = excluded.queued_at,
                retries = 0,
                last_error = NULL,
                next_retry = excluded.next_retry
            "#,
        )
        .bind(key)
        .bind(size)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(file = key, size, "Enqueued");
        Ok(())
    }

    /// First due entry in path order, or `None` if nothing is due.
    ///
    /// The entry stays in the queue until it is marked complete.
    pub async fn dequeue(&self) -> Result<Option<QueueEntry>> {
        self.dequeue_at(Utc::now()).await
    }

    /// [`dequeue`](Self::dequeue) with an explicit clock.
    ///
    /// Rows that no longer decode are logged and passed over so they cannot
    /// block the entries behind them.
    pub async fn dequeue_at(&self, now: DateTime<Utc>) -> Result<Option<QueueEntry>> {
        let mut skipped: i64 = 0;
        loop {
            let row: Option<EntryRow> = sqlx::query_as(
                r#"
                SELECT path, size, queued_at, retries, last_error, next_retry
                FROM pending_files
                WHERE next_retry <= ?
                ORDER BY path ASC
                LIMIT 1 OFFSET ?
                "#,
            )
            .bind(now.timestamp_millis())
            .bind(skipped)
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };
            match QueueEntry::try_from(row) {
                Ok(entry) => return Ok(Some(entry)),
                Err(e) => {
                    warn!("Skipping undecodable queue entry: {e}");
                    skipped += 1;
                }
            }
        }
    }

    /// Look up the entry for `path`.
    pub async fn get(&self, path: &Path) -> Result<Option<QueueEntry>> {
        let key = key_for(path)?;
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT path, size, queued_at, retries, last_error, next_retry
            FROM pending_files
            WHERE path = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QueueEntry::try_from).transpose()
    }

    /// Remove the entry for a delivered file. Absent entries are ignored.
    pub async fn mark_complete(&self, path: &Path) -> Result<()> {
        let key = key_for(path)?;
        let removed = sqlx::query("DELETE FROM pending_files WHERE path = ?")
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            debug!(file = key, "Completed entry was already gone");
        }
        Ok(())
    }

    /// Record a failed attempt and push the entry along the backoff ladder.
    pub async fn mark_failed(&self, path: &Path, error: &str) -> Result<QueueEntry> {
        self.mark_failed_at(path, error, Utc::now()).await
    }

    /// [`mark_failed`](Self::mark_failed) with an explicit clock.
    pub async fn mark_failed_at(
        &self,
        path: &Path,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        let key = key_for(path)?;
        let mut tx = self.pool.begin().await?;

        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT path, size, queued_at, retries, last_error, next_retry
            FROM pending_files
            WHERE path = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(QueueError::NotFound(key.to_string()));
        };
        let mut entry = QueueEntry::try_from(row)?;

        entry.retries = entry.retries.saturating_add(1);
        entry.last_error = Some(error.to_string());
        let delay = chrono::Duration::from_std(backoff_for(entry.retries))
            .unwrap_or(chrono::Duration::MAX);
        // Never move the retry time backwards, even if the wall clock did.
        entry.next_retry = (now + delay).max(entry.next_retry);

        sqlx::query(
            r#"
            UPDATE pending_files
            SET retries = ?, last_error = ?, next_retry = ?
            WHERE path = ?
            "#,
        )
        .bind(i64::from(entry.retries))
        .bind(error)
        .bind(entry.next_retry.timestamp_millis())
        .bind(key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        warn!(
            file = key,
            retries = entry.retries,
            next_retry = %entry.next_retry,
            error,
            "Upload failed, scheduling retry"
        );
        Ok(entry)
    }

    /// Number of entries in the queue.
    pub async fn size(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Close the underlying database.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn key_for(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| QueueError::InvalidPath(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn open_temp() -> (TempDir, DurableQueue) {
        let temp_dir = TempDir::new().unwrap();
        let queue = DurableQueue::open(temp_dir.path().join("state").join("queue.db"))
            .await
            .unwrap();
        (temp_dir, queue)
    }

    #[tokio::test]
    async fn test_enqueue_twice_keeps_one_entry() {
        let (_dir, queue) = open_temp().await;
        let path = Path::new("/watch/report.pdf");
        let now = Utc::now();

        queue.enqueue_at(path, 10, now).await.unwrap();
        queue.mark_failed_at(path, "boom", now).await.unwrap();
        queue.enqueue_at(path, 20, now).await.unwrap();

        assert_eq!(queue.size().await.unwrap(), 1);
        let entry = queue.get(path).await.unwrap().unwrap();
        assert_eq!(entry.retries, 0);
        assert_eq!(entry.size, 20);
        assert_eq!(entry.last_error, None);
        assert!(entry.is_due(now));
    }

    #[tokio::test]
    async fn test_dequeue_is_lexicographic_not_arrival_order() {
        let (_dir, queue) = open_temp().await;
        let now = Utc::now();

        queue.enqueue_at(Path::new("/watch/b.pdf"), 1, now).await.unwrap();
        queue.enqueue_at(Path::new("/watch/a.pdf"), 1, now).await.unwrap();

        let first = queue.dequeue_at(now).await.unwrap().unwrap();
        assert_eq!(first.path, Path::new("/watch/a.pdf"));

        // Dequeue does not remove.
        let again = queue.dequeue_at(now).await.unwrap().unwrap();
        assert_eq!(again.path, Path::new("/watch/a.pdf"));

        queue.mark_complete(&first.path).await.unwrap();
        let second = queue.dequeue_at(now).await.unwrap().unwrap();
        assert_eq!(second.path, Path::new("/watch/b.pdf"));
    }

    #[tokio::test]
    async fn test_undecodable_row_does_not_stall_the_queue() {
        let (_dir, queue) = open_temp().await;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO pending_files (path, size, queued_at, retries, next_retry) VALUES ('/watch/a.pdf', -1, 0, 0, 0)",
        )
        .execute(&queue.pool)
        .await
        .unwrap();
        queue
            .enqueue_at(Path::new("/watch/b.pdf"), 10, now)
            .await
            .unwrap();

        let entry = queue.dequeue_at(now).await.unwrap().unwrap();
        assert_eq!(entry.path, PathBuf::from("/watch/b.pdf"));

        queue.mark_complete(&entry.path).await.unwrap();
        assert_eq!(queue.dequeue_at(now).await.unwrap(), None);
        assert_eq!(queue.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dequeue_skips_entries_not_yet_due() {
        let (_dir, queue) = open_temp().await;
        let now = Utc::now();
        let path = Path::new("/watch/a.pdf");

        queue.enqueue_at(path, 1, now).await.unwrap();
        let entry = queue.mark_failed_at(path, "503", now).await.unwrap();
        assert_eq!(entry.next_retry, now + chrono::Duration::seconds(5));

        assert!(queue.dequeue_at(now).await.unwrap().is_none());
        assert!(
            queue
                .dequeue_at(now + chrono::Duration::seconds(4))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            queue
                .dequeue_at(now + chrono::Duration::seconds(5))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_backoff_ladder_is_exact() {
        let (_dir, queue) = open_temp().await;
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let path = Path::new("/watch/a.pdf");
        queue.enqueue_at(path, 1, now).await.unwrap();

        let expected = [5, 10, 30, 60, 300, 300, 300, 300, 300, 300, 1800, 1800];
        for (i, secs) in expected.iter().enumerate() {
            let entry = queue.mark_failed_at(path, "500", now).await.unwrap();
            assert_eq!(entry.retries as usize, i + 1);
            assert_eq!(entry.next_retry, now + chrono::Duration::seconds(*secs));
        }
    }

    #[tokio::test]
    async fn test_eleven_failures_keep_entry_at_thirty_minutes() {
        let (_dir, queue) = open_temp().await;
        let path = Path::new("/watch/a.pdf");
        let mut now = Utc::now();
        queue.enqueue_at(path, 1, now).await.unwrap();

        for _ in 0..11 {
            let due = queue.dequeue_at(now).await.unwrap().unwrap();
            let entry = queue.mark_failed_at(&due.path, "status 500", now).await.unwrap();
            now = entry.next_retry;
        }

        let entry = queue.get(path).await.unwrap().unwrap();
        assert_eq!(entry.retries, 11);
        assert_eq!(entry.last_error.as_deref(), Some("status 500"));
        assert_eq!(queue.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_retry_never_decreases() {
        let (_dir, queue) = open_temp().await;
        let path = Path::new("/watch/a.pdf");
        let now = Utc::now();
        queue.enqueue_at(path, 1, now).await.unwrap();

        let first = queue.mark_failed_at(path, "x", now).await.unwrap();
        // Clock stepped back an hour.
        let earlier = now - chrono::Duration::hours(1);
        let second = queue.mark_failed_at(path, "x", earlier).await.unwrap();
        assert!(second.next_retry >= first.next_retry);
    }

    #[tokio::test]
    async fn test_mark_failed_missing_entry() {
        let (_dir, queue) = open_temp().await;
        let result = queue.mark_failed(Path::new("/watch/nope.pdf"), "x").await;
        assert!(matches!(result, Err(QueueError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_complete_removes_entry() {
        let (_dir, queue) = open_temp().await;
        let path = Path::new("/watch/a.pdf");
        queue.enqueue(path, 1).await.unwrap();

        queue.mark_complete(path).await.unwrap();
        assert_eq!(queue.size().await.unwrap(), 0);
        assert!(queue.dequeue().await.unwrap().is_none());

        // Completing twice is harmless.
        queue.mark_complete(path).await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("queue.db");
        let path = Path::new("/watch/a.pdf");

        {
            let queue = DurableQueue::open(&db_path).await.unwrap();
            queue.enqueue(path, 42).await.unwrap();
            queue.mark_failed(path, "offline").await.unwrap();
            queue.close().await;
        }

        let queue = DurableQueue::open(&db_path).await.unwrap();
        let entry = queue.get(path).await.unwrap().unwrap();
        assert_eq!(entry.size, 42);
        assert_eq!(entry.retries, 1);
        assert_eq!(entry.last_error.as_deref(), Some("offline"));
    }
}
