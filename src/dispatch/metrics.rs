//! Lock-free dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::info;

/// Per-dispatcher counters for cache and network activity.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Fetches answered from the cache.
    pub cache_hits: AtomicU64,
    /// Fetches that had to go to the network.
    pub cache_misses: AtomicU64,
    /// Network calls issued (admitted by the limiter).
    pub network_calls: AtomicU64,
    /// Network fetches that ended in a transport, upstream, or decode error.
    /// Typed-view mismatches in `fetch_as` are not counted.
    pub failures: AtomicU64,
    /// Cumulative time spent waiting for rate-limit admission, in ms.
    pub admission_wait_ms: AtomicU64,
}

/// Plain copy of [`DispatchMetrics`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_calls: u64,
    pub failures: u64,
    pub admission_wait_ms: u64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an admitted network call and the time it waited for admission.
    pub fn record_call(&self, waited: Duration) {
        self.network_calls.fetch_add(1, Ordering::Relaxed);
        let ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
        self.admission_wait_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            network_calls: self.network_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            admission_wait_ms: self.admission_wait_ms.load(Ordering::Relaxed),
        }
    }

    /// Emit current counters as a structured log line.
    pub fn emit_usage(&self, reason: &str) {
        let s = self.snapshot();
        info!(
            event = "dispatch_summary",
            reason = reason,
            cache_hits = s.cache_hits,
            cache_misses = s.cache_misses,
            network_calls = s.network_calls,
            failures = s.failures,
            admission_wait_ms = s.admission_wait_ms,
            "Dispatch metrics"
        );
    }
}

impl MetricsSnapshot {
    /// Fraction of fetches served from cache, `0.0` when nothing was fetched.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
