//! In-process store backed by moka.
//!
//! Entries carry their own time-to-live, applied through moka's `Expiry`
//! policy, so one cache serves both the 24-hour completion entries and
//! the short-lived rate-limit counters. Counter updates go through
//! moka's per-key `and_compute_with`, which runs the closure under the
//! entry's lock — concurrent `check_and_incr` calls never lose updates.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use crate::{KvStore, Result};

/// A stored value together with its remaining lifetime policy.
#[derive(Clone)]
struct StoredEntry {
    data: Vec<u8>,
    ttl: Duration,
}

/// Per-entry expiry: each write (insert or replace) restarts the clock
/// at the entry's own TTL. The rate limiter relies on the refresh —
/// every admitted request slides the window forward.
struct EntryTtl;

impl Expiry<String, StoredEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _updated_at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-memory [`KvStore`] implementation.
///
/// Suitable for a single-process deployment and for tests. A shared
/// deployment (multiple gateway instances) wants a network-backed store
/// behind the same trait; the key and value encodings are
/// backend-agnostic.
#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, StoredEntry>,
}

impl MemoryStore {
    /// Create a store bounded to `max_entries` live entries.
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|entry| entry.data))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.cache
            .insert(key.to_string(), StoredEntry { data: value, ttl })
            .await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn check_and_incr(&self, key: &str, limit: u32, window: Duration) -> Result<bool> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    None => Op::Put(counter_entry(1, window)),
                    Some(entry) => {
                        let count = decode_count(&entry.into_value().data);
                        if count >= u64::from(limit) {
                            Op::Nop
                        } else {
                            Op::Put(counter_entry(count + 1, window))
                        }
                    }
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }
}

/// Counters are stored as decimal text, which doubles as a valid JSON
/// number for `get` callers.
fn counter_entry(count: u64, window: Duration) -> StoredEntry {
    StoredEntry {
        data: count.to_string().into_bytes(),
        ttl: window,
    }
}

fn decode_count(data: &[u8]) -> u64 {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .unwrap_or(0)
}
