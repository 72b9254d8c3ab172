//! Completion orchestrator.
//!
//! One `submit` call walks the full pipeline: normalize, rate-limit
//! gate, cache probe, upstream dispatch, answer extraction, cache write.
//! Every path terminates in a [`ResponseEnvelope`] — the orchestrator
//! never returns a bare error, so front-ends only translate the envelope
//! to their wire format.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::cache::CacheService;
use super::extract;
use crate::telemetry;
use crate::upstream::CompletionBackend;
use crate::{BifrostError, CompletionRequest, ResponseEnvelope};

/// Orchestrator policy knobs.
///
/// ```rust
/// # use bifrost::ServiceConfig;
/// # use std::time::Duration;
/// let config = ServiceConfig::new()
///     .user_limit(100, Duration::from_secs(60))
///     .cache_ttl(Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Requests each user may make per window. Default: 100.
    pub user_limit: u32,
    /// Length of the per-user fixed window. Default: 60 seconds.
    pub user_window: Duration,
    /// Time-to-live for cached answers. Default: 24 hours.
    pub cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            user_limit: 100,
            user_window: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl ServiceConfig {
    /// Create a config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-user request limit and window.
    pub fn user_limit(mut self, limit: u32, window: Duration) -> Self {
        self.user_limit = limit;
        self.user_window = window;
        self
    }

    /// Set the cached-answer time-to-live.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

/// Top-level completion pipeline.
pub struct CompletionService {
    backend: Arc<dyn CompletionBackend>,
    cache: CacheService,
    config: ServiceConfig,
}

impl CompletionService {
    /// Create a service over the given backend and cache.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        cache: CacheService,
        config: ServiceConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            config,
        }
    }

    /// Run one completion request through the pipeline.
    ///
    /// The returned envelope always owns its payload — it never aliases
    /// cache-internal storage, so callers may mutate it freely.
    pub async fn submit(&self, request: CompletionRequest) -> ResponseEnvelope {
        let envelope = self.submit_inner(request).await;
        metrics::counter!(telemetry::REQUESTS_TOTAL, "code" => envelope.code.to_string())
            .increment(1);
        envelope
    }

    async fn submit_inner(&self, request: CompletionRequest) -> ResponseEnvelope {
        let request = request.normalized();

        // Rate-limit gate. A check failure is fatal: admitting through a
        // broken limiter would defeat it.
        match self
            .cache
            .check_and_consume(&request.user, self.config.user_limit, self.config.user_window)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
                return ResponseEnvelope::failure(429, "rate limit exceeded");
            }
            Err(err) => {
                return ResponseEnvelope::failure(500, format!("rate limit check failed: {err}"));
            }
        }

        // Cache probe. A lookup failure only costs us the shortcut.
        match self.cache.cached_result(&request.user, &request.query).await {
            Ok(Some(result)) => return ResponseEnvelope::cached(result),
            Ok(None) => {}
            Err(err) => {
                warn!(user = %request.user, error = %err, "cache lookup failed, treating as miss");
            }
        }

        let reply = match self.backend.complete(&request).await {
            Ok(reply) => reply,
            Err(BifrostError::Cancelled { task_id }) => {
                self.notify_cancel(task_id.as_deref(), &request.user).await;
                return ResponseEnvelope::failure(499, "request cancelled");
            }
            Err(err) => {
                let code = err.status_code().map(i32::from).unwrap_or(500);
                return ResponseEnvelope::failure(
                    code,
                    format!("upstream completion failed: {err}"),
                );
            }
        };

        if reply.answer.is_empty() {
            return ResponseEnvelope::failure(500, "invalid response: empty answer from upstream");
        }

        let answer = match extract::parse_answer(&reply.answer) {
            Ok(answer) => answer,
            Err(err) => {
                return ResponseEnvelope::failure(500, format!("invalid JSON format in answer: {err}"));
            }
        };

        let result = extract::extract_result(&answer);

        if let Err(err) = self
            .cache
            .store_result(&request.user, &request.query, &result, self.config.cache_ttl)
            .await
        {
            warn!(user = %request.user, error = %err, "failed to cache completion result");
        }

        ResponseEnvelope::success(result)
    }

    /// Best-effort upstream stop after a cancellation. The outcome is
    /// logged and discarded; the caller still gets the cancellation
    /// envelope.
    async fn notify_cancel(&self, task_id: Option<&str>, user: &str) {
        match task_id {
            Some(task_id) => match self.backend.cancel(task_id, user).await {
                Ok(()) => debug!(task_id, "upstream stop delivered"),
                Err(err) => warn!(task_id, error = %err, "upstream stop failed"),
            },
            None => debug!("no task id observed before cancellation, skipping upstream stop"),
        }
    }
}
