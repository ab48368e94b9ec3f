//! # Durable Queue
//!
//! A crash-durable, at-least-once work queue for files awaiting upload.
//!
//! Entries are keyed by absolute file path and live in a single SQLite table,
//! so pending work survives a process restart. Failed deliveries are pushed
//! back along a fixed backoff ladder rather than dropped.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Durable Queue                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  enqueue ──► pending_files (path PK) ──► dequeue (path order)  │
//! │                    │            ▲                               │
//! │                    ▼            │                               │
//! │             mark_complete   mark_failed ──► backoff_for        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//!
//! `dequeue` returns the first *due* entry in lexicographic path order, not
//! arrival order. Two files enqueued as `b.pdf` then `a.pdf` are delivered as
//! `a.pdf` then `b.pdf` when both are due.
//!
//! `dequeue` grants no lease: the queue assumes a single consumer.

pub mod backoff;
pub mod entry;
pub mod error;
pub mod queue;

use std::path::PathBuf;

pub use backoff::backoff_for;
pub use entry::QueueEntry;
pub use error::{QueueError, Result};
pub use queue::DurableQueue;

/// File name of the queue database inside the application data directory.
pub const QUEUE_FILE_NAME: &str = "queue.db";

/// Directory holding the agent's queue and logs.
///
/// On Windows this is the machine-wide `%ProgramData%\docsync`, which the
/// boot task running as SYSTEM shares with the installing user. Elsewhere it
/// is `<data_dir>/docsync`, falling back to `~/.docsync`.
pub fn default_data_dir() -> PathBuf {
    #[cfg(windows)]
    {
        machine_data_dir(std::env::var_os("ProgramData"))
    }

    #[cfg(not(windows))]
    {
        match dirs::data_dir() {
            Some(dir) => dir.join("docsync"),
            None => dirs::home_dir().unwrap_or_default().join(".docsync"),
        }
    }
}

/// `<ProgramData>\docsync`, with `C:\ProgramData` when the variable is unset.
#[cfg(any(windows, test))]
fn machine_data_dir(program_data: Option<std::ffi::OsString>) -> PathBuf {
    program_data
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
        .join("docsync")
}

/// Default on-disk location of the queue database: `queue.db` inside
/// [`default_data_dir`].
pub fn default_queue_path() -> PathBuf {
    default_data_dir().join(QUEUE_FILE_NAME)
}
