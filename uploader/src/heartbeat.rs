//! Periodic liveness report.

use std::time::Duration;

use docsync_queue::DurableQueue;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::IngestClient;

/// Interval used when the configured one is not positive.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);

/// Resolve a configured interval in seconds.
pub fn heartbeat_interval(seconds: i64) -> Duration {
    match u64::try_from(seconds) {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => DEFAULT_HEARTBEAT_INTERVAL,
    }
}

/// Heartbeat payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heartbeat {
    pub version: String,
    pub status: String,
    pub queue_size: usize,
}

impl Heartbeat {
    pub fn running(version: impl Into<String>, queue_size: usize) -> Self {
        Self {
            version: version.into(),
            status: "running".to_string(),
            queue_size,
        }
    }
}

/// Sends a heartbeat at start and then once per interval.
pub struct HeartbeatLoop {
    client: IngestClient,
    queue: DurableQueue,
    version: String,
    interval: Duration,
}

impl HeartbeatLoop {
    pub fn new(
        client: IngestClient,
        queue: DurableQueue,
        version: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            queue,
            version: version.into(),
            interval,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        // The first tick completes immediately.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.beat().await,
            }
        }
    }

    /// Send one heartbeat. Failures are logged and swallowed.
    pub async fn beat(&self) {
        let queue_size = match self.queue.size().await {
            Ok(size) => size,
            Err(e) => {
                warn!("Failed to read queue size for heartbeat: {e}");
                0
            }
        };

        let heartbeat = Heartbeat::running(&self.version, queue_size);
        if let Err(e) = self.client.send_heartbeat(&heartbeat).await {
            debug!("Heartbeat failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HEARTBEAT_PATH;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_interval_falls_back_when_not_positive() {
        assert_eq!(heartbeat_interval(0), DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(heartbeat_interval(-5), DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(heartbeat_interval(60), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_first_heartbeat_is_sent_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HEARTBEAT_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let queue = DurableQueue::open(dir.path().join("queue.db"))
            .await
            .unwrap();
        queue
            .enqueue(&dir.path().join("waiting.pdf"), 3)
            .await
            .unwrap();

        let client = IngestClient::new(server.uri(), "tok").unwrap();
        let heartbeat = HeartbeatLoop::new(client, queue, "0.1.0", Duration::from_secs(3600));

        let cancel = CancellationToken::new();
        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { heartbeat.run(cancel).await })
        };

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while server.received_requests().await.unwrap().is_empty()
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        cancel.cancel();
        task.await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"version": "0.1.0", "status": "running", "queue_size": 1})
        );
    }

    #[tokio::test]
    async fn test_failed_heartbeat_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let queue = DurableQueue::open(dir.path().join("queue.db"))
            .await
            .unwrap();
        let client = IngestClient::new(server.uri(), "tok").unwrap();

        HeartbeatLoop::new(client, queue, "0.1.0", Duration::from_secs(1))
            .beat()
            .await;
    }
}
