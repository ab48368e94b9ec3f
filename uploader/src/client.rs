//! HTTP client for the ingest API.

use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::{Result, UploadError};
use crate::heartbeat::Heartbeat;
use crate::{SOURCE_TAG, TOKEN_HEADER};

/// Path of the document ingest endpoint.
pub const INGEST_PATH: &str = "/api/v1/ingest/document/";

/// Path of the heartbeat endpoint.
pub const HEARTBEAT_PATH: &str = "/api/v1/agent/heartbeat/";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Short-horizon retry applied inside a single upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first request.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub min_delay: Duration,

    /// Upper bound for any delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// No transport retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before the `retry`-th retry (1-based): doubling from
    /// `min_delay`, capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        std::cmp::min(self.min_delay.saturating_mul(factor), self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// How the server accepted a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 2xx: stored.
    Accepted,

    /// 409: the server already holds this content.
    AlreadyPresent,
}

/// Client for the ingest and heartbeat endpoints.
#[derive(Clone)]
pub struct IngestClient {
    /// HTTP client.
    http: reqwest::Client,

    /// Base URL without trailing slash.
    endpoint: String,

    /// Bearer token sent in [`TOKEN_HEADER`].
    token: String,

    /// Transport retry for uploads.
    retry: RetryPolicy,
}

impl IngestClient {
    /// Create a client for `endpoint` authenticating with `token`.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(UploadError::InvalidEndpoint(endpoint));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("docsync-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            token: token.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the transport retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL of the service.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload the file at `path` with its precomputed digest.
    ///
    /// The multipart body streams the file from disk and is rebuilt for every
    /// transport retry. Connection errors, 429 and 5xx (except 501) are
    /// retried per the [`RetryPolicy`]; anything left over is returned.
    pub async fn upload_document(&self, path: &Path, sha256: &str) -> Result<IngestOutcome> {
        let url = format!("{}{INGEST_PATH}", self.endpoint);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut retry = 0;
        loop {
            let form = document_form(path, &file_name, sha256).await?;
            let result = self
                .http
                .post(&url)
                .header(TOKEN_HEADER, &self.token)
                .multipart(form)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(IngestOutcome::Accepted);
                    }
                    if status == StatusCode::CONFLICT {
                        info!(file = %path.display(), "File already exists (duplicate)");
                        return Ok(IngestOutcome::AlreadyPresent);
                    }
                    if !is_retryable_status(status) || retry >= self.retry.max_retries {
                        let body = response.text().await.unwrap_or_default();
                        return Err(UploadError::Rejected {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    debug!(file = %path.display(), %status, retry, "Retrying upload");
                }
                Err(e) => {
                    if !is_transient(&e) || retry >= self.retry.max_retries {
                        return Err(e.into());
                    }
                    debug!(file = %path.display(), retry, "Retrying upload after error: {e}");
                }
            }

            retry += 1;
            tokio::time::sleep(self.retry.delay_for(retry)).await;
        }
    }

    /// Post one heartbeat. Never retried.
    pub async fn send_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        let response = self
            .http
            .post(format!("{}{HEARTBEAT_PATH}", self.endpoint))
            .header(TOKEN_HEADER, &self.token)
            .timeout(HEARTBEAT_TIMEOUT)
            .json(heartbeat)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

async fn document_form(path: &Path, file_name: &str, sha256: &str) -> Result<Form> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
    let part = Part::stream_with_length(body, length)
        .file_name(file_name.to_string())
        .mime_str("application/octet-stream")?;

    Ok(Form::new()
        .part("file", part)
        .text("sha256", sha256.to_string())
        .text("source", SOURCE_TAG))
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
        }
    }

    fn sample_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7 sample").unwrap();
        path
    }

    #[test]
    fn test_retry_delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_endpoint_without_scheme() {
        let result = IngestClient::new("portal.example.com", "tok");
        assert!(matches!(result, Err(UploadError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .and(header(TOKEN_HEADER, "secret-token"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = sample_file(&dir);
        let client = IngestClient::new(format!("{}/", server.uri()), "secret-token").unwrap();

        let outcome = client.upload_document(&file, "abc123").await.unwrap();
        assert_eq!(outcome, IngestOutcome::Accepted);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\"; filename=\"report.pdf\""));
        assert!(body.contains("%PDF-1.7 sample"));
        assert!(body.contains("name=\"sha256\""));
        assert!(body.contains("abc123"));
        assert!(body.contains(SOURCE_TAG));
    }

    #[tokio::test]
    async fn test_conflict_means_already_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = IngestClient::new(server.uri(), "tok")
            .unwrap()
            .with_retry_policy(fast_retry());

        let outcome = client
            .upload_document(&sample_file(&dir), "abc")
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::AlreadyPresent);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_within_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = IngestClient::new(server.uri(), "tok")
            .unwrap()
            .with_retry_policy(fast_retry());

        let outcome = client
            .upload_document(&sample_file(&dir), "abc")
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Accepted);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("unsupported file type"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = IngestClient::new(server.uri(), "tok")
            .unwrap()
            .with_retry_policy(fast_retry());

        let err = client
            .upload_document(&sample_file(&dir), "abc")
            .await
            .unwrap_err();
        match err {
            UploadError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "unsupported file type");
            }
            other => panic!("expected rejection, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_server_errors_give_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INGEST_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(4)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = IngestClient::new(server.uri(), "tok")
            .unwrap()
            .with_retry_policy(fast_retry());

        let err = client
            .upload_document(&sample_file(&dir), "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_heartbeat_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HEARTBEAT_PATH))
            .and(header(TOKEN_HEADER, "tok"))
            .and(body_json(serde_json::json!({
                "version": "1.2.3",
                "status": "running",
                "queue_size": 7
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = IngestClient::new(server.uri(), "tok").unwrap();
        client
            .send_heartbeat(&Heartbeat::running("1.2.3", 7))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HEARTBEAT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = IngestClient::new(server.uri(), "tok")
            .unwrap()
            .with_retry_policy(fast_retry());
        assert!(
            client
                .send_heartbeat(&Heartbeat::running("1.2.3", 0))
                .await
                .is_err()
        );
    }
}
