//! # Docsync agent
//!
//! Wires the watcher, the durable queue and the uploader into one process and
//! exposes it as the `docsync` binary.
//!
//! ```text
//! config.yaml ──► AgentConfig
//!                     │
//!   CredentialStore ──┼──► run_agent ──┬──► Watcher::run
//!                     │                ├──► Uploader::run
//!                     │                └──► HeartbeatLoop::run
//!                     ▼
//!               ServiceRuntime (install / start / stop / status)
//! ```
//!
//! All long-running tasks share one `CancellationToken`; Ctrl-C or SIGTERM
//! cancels it and the tasks finish their current step before exiting.

pub mod build_info;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod service;

pub use config::AgentConfig;
pub use error::{ConfigError, ServiceError};
pub use runtime::{run_agent, shutdown_signal};
pub use service::{ServiceDefinition, ServiceRuntime, ServiceStatus, platform_service};
