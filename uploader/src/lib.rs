//! # Uploader
//!
//! Drains the durable queue into the remote ingest service.
//!
//! ## Features
//!
//! - **Streaming Digest**: SHA-256 computed in bounded memory; doubles as the
//!   server-side idempotency token
//! - **Transport Retry**: A few quick retries for connection errors and 5xx,
//!   invisible to the queue
//! - **Idempotent Ingest**: `409 Conflict` counts as delivered
//! - **Relocation**: Delivered files move to the processed folder with a
//!   timestamp prefix
//! - **Heartbeat**: Best-effort liveness report with the queue depth
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Uploader                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DurableQueue ──► dequeue (2s tick) ──► sha256 ──► IngestClient │
//! │       ▲                                                │        │
//! │       └──── mark_complete / mark_failed ◄──────────────┘        │
//! │                   │                                             │
//! │                   ▼                                             │
//! │             relocate_to_processed                               │
//! │                                                                 │
//! │  HeartbeatLoop ──► IngestClient::send_heartbeat (5 min tick)    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two retry layers never mix: [`RetryPolicy`] retries inside one attempt
//! (seconds), while the queue's backoff ladder spaces separate attempts
//! (minutes).

pub mod client;
pub mod digest;
pub mod error;
pub mod heartbeat;
pub mod relocate;
pub mod uploader;

pub use client::{IngestClient, IngestOutcome, RetryPolicy};
pub use digest::sha256_file;
pub use error::{Result, UploadError};
pub use heartbeat::{Heartbeat, HeartbeatLoop, heartbeat_interval};
pub use relocate::relocate_to_processed;
pub use uploader::{Delivery, DeliveryOutcome, Uploader};

/// Fixed `source` tag sent with every document.
pub const SOURCE_TAG: &str = "docsync-agent";

/// Header carrying the bearer token.
pub const TOKEN_HEADER: &str = "X-DMS-Token";
