//! Key/value store abstraction with expiration.
//!
//! The completion cache and the per-user rate-limit counters both live
//! behind this trait. Values are opaque serialized payloads the callers
//! encode/decode as JSON; the store never interprets them — with one
//! exception: [`check_and_incr`](KvStore::check_and_incr) owns the
//! counter encoding so the check-and-consume step can be atomic.
//!
//! Every operation can fail with a connectivity error on a network-backed
//! implementation; the in-process [`MemoryStore`] is infallible but keeps
//! the same signatures.

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

mod memory;

pub use memory::MemoryStore;

/// Minimal expiring key/value contract consumed by the gateway.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored at `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key` with the given time-to-live, replacing any
    /// existing entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Whether an unexpired entry exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomic check-and-consume on the counter at `key`.
    ///
    /// If the counter is below `limit` (or absent), increments it
    /// (initializing to 1) and refreshes its expiry to the full `window`,
    /// returning `true`. At or above `limit`, returns `false` without
    /// touching the entry. Implementations must not lose concurrent
    /// increments — a read-then-write pair is not a valid implementation.
    async fn check_and_incr(&self, key: &str, limit: u32, window: Duration) -> Result<bool>;
}
