//! HTTP client for the upstream completion provider.
//!
//! One `POST /v1/chat-messages` per attempt, bearer-token authenticated,
//! up to `max_attempts` attempts with exponential backoff on transient
//! failures. The whole retry sequence — including the outbound throttle
//! wait and every backoff sleep — runs under a single caller deadline.
//!
//! # Outcome ordering
//!
//! The dispatch loop reports through one ordered channel: the provider's
//! task id is always delivered (and stored by the consumer) before the
//! terminal `Done`/`Failed` message. When the deadline elapses mid-flight
//! the call returns [`BifrostError::Cancelled`] carrying the last
//! observed task id so the orchestrator can attempt a stop call.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use super::repair::extract_json_object;
use super::throttle::Throttle;
use super::{CompletionBackend, UpstreamReply};
use crate::telemetry;
use crate::{BifrostError, CompletionRequest, Result};

/// Time allowed for the out-of-band stop and maintenance calls.
const SIDE_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the upstream client.
///
/// ```rust
/// # use bifrost::UpstreamConfig;
/// # use std::time::Duration;
/// let config = UpstreamConfig::new("https://api.example.com", "app-key")
///     .rate(10, 10)
///     .timeout(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the provider, without the `/v1/...` path.
    pub endpoint: String,
    /// Bearer token sent on every call.
    pub api_key: String,
    /// Sustained outbound rate, shared across all callers. Default: 10/s.
    pub rate_per_second: u32,
    /// Burst capacity of the outbound throttle. Default: 10.
    pub rate_burst: u32,
    /// Deadline for one `complete` call, covering the throttle wait and
    /// the whole retry sequence. Default: 10 minutes.
    pub timeout: Duration,
    /// Attempts per call (including the first). Default: 3.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles each retry, no jitter,
    /// no cap. Default: 1 second.
    pub initial_backoff: Duration,
}

impl UpstreamConfig {
    /// Create a config with the given endpoint and key, defaults elsewhere.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            rate_per_second: 10,
            rate_burst: 10,
            timeout: Duration::from_secs(600),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }

    /// Set the outbound throttle rate and burst.
    pub fn rate(mut self, per_second: u32, burst: u32) -> Self {
        self.rate_per_second = per_second;
        self.rate_burst = burst;
        self
    }

    /// Set the per-call deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt budget (including the initial request).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff before the first retry.
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }
}

/// Ordered dispatch progress; the task id always precedes the terminal
/// outcome.
enum Progress {
    TaskId(String),
    Done(UpstreamReply),
    Failed(BifrostError),
}

/// Client for the upstream completion endpoint.
pub struct UpstreamClient {
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
    throttle: Throttle,
    timeout: Duration,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl UpstreamClient {
    /// Create a client from the given configuration.
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let throttle = Throttle::new(config.rate_per_second, config.rate_burst)?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            http,
            throttle,
            timeout: config.timeout,
            max_attempts: config.max_attempts,
            initial_backoff: config.initial_backoff,
        })
    }

    /// Issue one blocking completion call.
    ///
    /// Waits on the outbound throttle first — a deadline expiry during
    /// the wait fails with [`BifrostError::ThrottleTimeout`] before any
    /// network I/O. Dropping the returned future aborts the in-flight
    /// attempt.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<UpstreamReply> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        self.throttle.acquire_until(deadline).await?;

        let payload = serde_json::to_vec(request)?;

        let (tx, mut rx) = mpsc::channel(4);
        let dispatch = self.dispatch(payload, tx);
        tokio::pin!(dispatch);
        let expiry = tokio::time::sleep_until(deadline);
        tokio::pin!(expiry);

        let started = std::time::Instant::now();
        let mut dispatch_done = false;
        let mut task_id: Option<String> = None;
        loop {
            tokio::select! {
                () = &mut expiry => return Err(BifrostError::Cancelled { task_id }),
                () = &mut dispatch, if !dispatch_done => dispatch_done = true,
                progress = rx.recv() => match progress {
                    Some(Progress::TaskId(id)) => task_id = (!id.is_empty()).then_some(id),
                    Some(Progress::Done(reply)) => {
                        metrics::histogram!(telemetry::UPSTREAM_DURATION_SECONDS)
                            .record(started.elapsed().as_secs_f64());
                        return Ok(reply);
                    }
                    Some(Progress::Failed(err)) => return Err(err),
                    None => {
                        return Err(BifrostError::Decode(
                            "upstream dispatch ended without an outcome".to_string(),
                        ));
                    }
                },
            }
        }
    }

    /// Ask the provider to stop the task identified by `task_id`.
    pub async fn cancel(&self, task_id: &str, user: &str) -> Result<()> {
        let url = format!("{}/v1/chat-messages/{}/stop", self.endpoint, task_id);
        let payload = serde_json::to_vec(&serde_json::json!({ "user": user }))?;

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(SIDE_CALL_TIMEOUT)
            .body(payload)
            .send()
            .await
            .map_err(|err| BifrostError::Http(err.to_string()))?;

        check_status(response).await
    }

    /// Delete a prior conversation held by the provider.
    pub async fn delete_conversation(&self, conversation_id: &str, user: &str) -> Result<()> {
        let url = format!("{}/v1/conversations/{}", self.endpoint, conversation_id);
        let payload = serde_json::to_vec(&serde_json::json!({ "user": user }))?;

        let response = self
            .http
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(SIDE_CALL_TIMEOUT)
            .body(payload)
            .send()
            .await
            .map_err(|err| BifrostError::Http(err.to_string()))?;

        check_status(response).await
    }

    /// Attempt loop. Sends every outcome through `tx` in order; the
    /// caller enforces the deadline by dropping this future.
    async fn dispatch(&self, payload: Vec<u8>, tx: mpsc::Sender<Progress>) {
        let url = format!("{}/v1/chat-messages", self.endpoint);
        let mut backoff = self.initial_backoff;

        for attempt in 0..self.max_attempts {
            let more_attempts = attempt + 1 < self.max_attempts;

            let response = match self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .body(payload.clone())
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    if more_attempts && is_retryable_error(&err) {
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            error = %err,
                            "transient upstream error, backing off"
                        );
                        metrics::counter!(telemetry::UPSTREAM_RETRIES_TOTAL).increment(1);
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                        continue;
                    }
                    let _ = tx
                        .send(Progress::Failed(BifrostError::Http(err.to_string())))
                        .await;
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                if more_attempts && is_retryable_status(status.as_u16()) {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        status = status.as_u16(),
                        "retryable upstream status, backing off"
                    );
                    metrics::counter!(telemetry::UPSTREAM_RETRIES_TOTAL).increment(1);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
                let message = response.text().await.unwrap_or_default();
                let message = if message.is_empty() {
                    format!("unexpected status code: {}", status.as_u16())
                } else {
                    message
                };
                let _ = tx
                    .send(Progress::Failed(BifrostError::Api {
                        status: status.as_u16(),
                        message,
                    }))
                    .await;
                return;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    let _ = tx
                        .send(Progress::Failed(BifrostError::Http(err.to_string())))
                        .await;
                    return;
                }
            };

            let mut reply = match decode_reply(&body) {
                Ok(reply) => reply,
                Err(err) => {
                    let _ = tx.send(Progress::Failed(err)).await;
                    return;
                }
            };

            // The answer itself may be JSON wrapped in prose; repair it
            // here so downstream parsing sees the clean object.
            if !reply.answer.is_empty() {
                if let Some(valid) = extract_json_object(&reply.answer).map(str::to_string) {
                    reply.answer = valid;
                }
            }

            let _ = tx.send(Progress::TaskId(reply.task_id.clone())).await;
            let _ = tx.send(Progress::Done(reply)).await;
            return;
        }
    }
}

#[async_trait]
impl CompletionBackend for UpstreamClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<UpstreamReply> {
        UpstreamClient::complete(self, request).await
    }

    async fn cancel(&self, task_id: &str, user: &str) -> Result<()> {
        UpstreamClient::cancel(self, task_id, user).await
    }
}

/// Decode the provider envelope, repairing a noisy body before giving up.
fn decode_reply(body: &str) -> Result<UpstreamReply> {
    match serde_json::from_str(body) {
        Ok(reply) => Ok(reply),
        Err(err) => match extract_json_object(body) {
            Some(candidate) => serde_json::from_str(candidate)
                .map_err(|err| BifrostError::Decode(format!("parse extracted json: {err}"))),
            None => Err(BifrostError::Decode(format!("invalid json response: {err}"))),
        },
    }
}

async fn check_status(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    let message = if message.is_empty() {
        format!("unexpected status code: {}", status.as_u16())
    } else {
        message
    };
    Err(BifrostError::Api {
        status: status.as_u16(),
        message,
    })
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 503 | 504)
}
