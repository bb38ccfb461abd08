//! In-memory response cache with TTL expiry and a capacity bound.
//!
//! Entries are keyed by canonical [`RequestKey`] and expire lazily: a stale
//! entry is only noticed (and dropped) when it is looked up, or swept when a
//! store finds the cache full. When the cache is still full after the sweep,
//! the entry stored longest ago is evicted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use super::key::RequestKey;
use crate::config::CacheConfig;

/// A single cached response body.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// Thread-safe response cache with TTL expiry and oldest-first eviction.
pub struct ResponseCache {
    entries: Mutex<HashMap<RequestKey, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    /// Create a cache with the given TTL and capacity.
    ///
    /// `max_entries` is clamped to a minimum of 1.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh payload. Returns `None` if absent or expired.
    ///
    /// Expired entries are removed. Fresh entries are returned untouched.
    pub fn lookup(&self, key: &RequestKey) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        let fresh = entries.get(key).map(|e| e.is_fresh(now, self.ttl));
        match fresh {
            Some(true) => entries.get(key).map(|e| e.payload.clone()),
            Some(false) => {
                debug!(key = %key.short_digest(), "Cache entry expired, removing");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a payload, replacing any previous entry for `key`.
    ///
    /// Sweeps expired entries first, then evicts the oldest entries if the
    /// cache is at capacity.
    pub fn store(&self, key: RequestKey, payload: Value) {
        let now = Instant::now();
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, e| e.is_fresh(now, ttl));
            while entries.len() >= self.max_entries {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                debug!(key = %oldest.short_digest(), "Evicting oldest cache entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                payload,
                stored_at: now,
            },
        );
    }

    /// Return aggregate statistics about the cache.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.lock();
        let expired_entries = entries
            .values()
            .filter(|e| !e.is_fresh(now, self.ttl))
            .count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries,
            max_entries: self.max_entries,
        }
    }

    /// Remove all entries from the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Return the number of entries currently held, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Return `true` if the cache contains no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave an entry half-written, so
    // a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<RequestKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .field("len", &self.len())
            .finish()
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently held (including not-yet-swept stale ones).
    pub total_entries: usize,
    /// Entries past their TTL that have not been removed yet.
    pub expired_entries: usize,
    /// Configured capacity.
    pub max_entries: usize,
}
