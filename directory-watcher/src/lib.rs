//! # Directory Watcher
//!
//! Watches the drop folder and decides when each new file is safe to upload.
//!
//! ## Features
//!
//! - **Startup Scan**: Recovers files left behind by a previous run
//! - **Real-time Watching**: Create/write notifications reset a per-file clock
//! - **Stability Gating**: A file is promoted only after a quiet period and a
//!   successful readiness check
//! - **Include Patterns**: Case-insensitive globs on the file name
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  notify ──► FileEvent ──► PendingFiles ◄── startup scan         │
//! │                                │                                │
//! │                                ▼  (1s tick, quiet ≥ window)     │
//! │                        readiness check ──► DurableQueue         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod pending;
pub mod readiness;
pub mod scan;
pub mod watcher;

pub use config::{IncludeMatcher, WatchConfig};
pub use error::{Result, WatcherError};
pub use event::{FileEvent, FileEventKind};
pub use pending::PendingFiles;
pub use readiness::{Readiness, ReadinessCheck, check_readiness};
pub use watcher::Watcher;
