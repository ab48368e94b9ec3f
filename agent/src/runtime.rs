//! Foreground pipeline: watcher, uploader and heartbeat on one runtime.

use anyhow::{Context, Result};
use docsync_credentials::CredentialStore;
use docsync_directory_watcher::{WatchConfig, Watcher};
use docsync_queue::DurableQueue;
use docsync_uploader::{HeartbeatLoop, IngestClient, Uploader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::build_info::{VERSION, version_string};
use crate::config::AgentConfig;

/// Run the agent until `cancel` fires.
///
/// A missing credential, an unusable queue or an unusable watch folder is
/// fatal and returned before any task starts. The watcher failing later
/// cancels the other tasks and is returned once they have stopped.
pub async fn run_agent(
    config: &AgentConfig,
    credentials: &dyn CredentialStore,
    cancel: CancellationToken,
) -> Result<()> {
    let token = credentials.get().with_context(|| {
        format!(
            "No ingest token in {}; run `docsync set-token <TOKEN>` first",
            credentials.name()
        )
    })?;

    let queue_path = config.queue_path();
    let queue = DurableQueue::open(&queue_path)
        .await
        .with_context(|| format!("Failed to open queue at {}", queue_path.display()))?;

    let watch_config = WatchConfig::new(&config.watch_folder)
        .with_patterns(config.include_patterns.iter().cloned())
        .with_stability_window(config.stability_window());
    let watcher = Watcher::new(watch_config, queue.clone())
        .with_context(|| format!("Failed to watch folder {}", config.watch_folder.display()))?;

    let client = IngestClient::new(&config.dms_url, token).context("Invalid dms_url")?;
    let mut uploader = Uploader::new(queue.clone(), client.clone());
    if let Some(processed) = config.processed_folder() {
        uploader = uploader.with_processed_folder(processed);
    }
    let heartbeat = HeartbeatLoop::new(client, queue.clone(), VERSION, config.heartbeat_interval());

    info!(
        version = %version_string(),
        folder = %watcher.root().display(),
        queue = %queue_path.display(),
        endpoint = %config.dms_url,
        "Agent started"
    );

    let watcher_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = watcher.run(cancel.clone()).await;
            if result.is_err() {
                cancel.cancel();
            }
            result
        })
    };
    let uploader_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { uploader.run(cancel).await })
    };
    let heartbeat_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { heartbeat.run(cancel).await })
    };

    let watched = watcher_task.await.context("Watcher task panicked")?;
    if let Err(e) = uploader_task.await {
        error!("Uploader task failed: {e}");
    }
    if let Err(e) = heartbeat_task.await {
        error!("Heartbeat task failed: {e}");
    }
    queue.close().await;

    watched.context("Directory watcher failed")?;
    info!("Agent stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
