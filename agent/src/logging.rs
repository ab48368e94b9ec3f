//! Tracing setup for the `docsync` binary.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "docsync=info,docsync_agent=info,docsync_directory_watcher=info,docsync_queue=info,docsync_uploader=info,docsync_credentials=info";

/// Base name of the daily rolling log file.
pub const LOG_FILE_NAME: &str = "agent.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Log to a daily rolling file in `log_dir` and to stderr.
///
/// If `log_dir` cannot be created only stderr is used. The returned guard
/// flushes the file writer when dropped and must live as long as the process.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        init_stderr_logging();
        tracing::warn!(
            dir = %log_dir.display(),
            "Cannot create log directory, logging to stderr only: {e}"
        );
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(env_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
        .try_init();

    installed.is_ok().then_some(guard)
}

/// Log to stderr only. Used by the one-shot commands.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
        .try_init();
}
