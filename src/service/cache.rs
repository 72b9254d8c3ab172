//! Read-through answer cache and per-user fixed-window rate limiting.
//!
//! Both policies share one [`KvStore`] under distinct key namespaces:
//! `completion:{user}:{query}` for cached answers, `rate_limit:{user}`
//! for request counters. Identical inputs always derive the same key;
//! distinct users never collide for the same query.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::telemetry;
use crate::{CompletionResult, KvStore, Result};

/// Cache and rate-limit policies over a [`KvStore`].
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn KvStore>,
}

impl CacheService {
    /// Create a service over the given store.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Key for a cached completion answer.
    pub fn completion_key(user: &str, query: &str) -> String {
        format!("completion:{user}:{query}")
    }

    /// Key for a user's rate-limit counter.
    pub fn rate_limit_key(user: &str) -> String {
        format!("rate_limit:{user}")
    }

    /// Look up the cached result for `(user, query)`.
    ///
    /// Returns an owned copy decoded from the stored bytes — callers can
    /// never observe or mutate the cache's internal storage. A stored
    /// payload that no longer decodes as a [`CompletionResult`] counts
    /// as a miss, not an error; only store connectivity failures surface
    /// as `Err`.
    pub async fn cached_result(
        &self,
        user: &str,
        query: &str,
    ) -> Result<Option<CompletionResult>> {
        let key = Self::completion_key(user, query);
        let Some(bytes) = self.store.get(&key).await? else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => "completion")
                .increment(1);
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(result) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => "completion")
                    .increment(1);
                Ok(Some(result))
            }
            Err(err) => {
                debug!(key, error = %err, "malformed cache entry treated as miss");
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => "completion")
                    .increment(1);
                Ok(None)
            }
        }
    }

    /// Store `result` for `(user, query)` under the given time-to-live,
    /// replacing any previous entry (last writer wins).
    pub async fn store_result(
        &self,
        user: &str,
        query: &str,
        result: &CompletionResult,
        ttl: Duration,
    ) -> Result<()> {
        let key = Self::completion_key(user, query);
        let bytes = serde_json::to_vec(result)?;
        self.store.set(&key, bytes, ttl).await
    }

    /// Consume one request from `user`'s fixed-window budget.
    ///
    /// Returns `false` once the window's `limit` is reached; admitted
    /// requests refresh the window to its full length. The underlying
    /// check-and-increment is atomic, so concurrent requests never lose
    /// counts. Store failures surface as `Err` — the caller decides
    /// whether that is fatal.
    pub async fn check_and_consume(
        &self,
        user: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool> {
        self.store
            .check_and_incr(&Self::rate_limit_key(user), limit, window)
            .await
    }
}
