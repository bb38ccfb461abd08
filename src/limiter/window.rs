//! Rolling-window admission control for outbound calls.
//!
//! Tracks the instant of every admitted call and keeps the number of calls
//! inside any trailing window at or below
//! `max_per_window - admission_buffer`. Callers that would exceed that bound
//! are suspended until the oldest call in the window ages out.
//!
//! # Example
//!
//! ```rust
//! use statline::config::RateLimitConfig;
//! use statline::limiter::RateLimiter;
//!
//! # async fn demo() {
//! let limiter = RateLimiter::new(RateLimitConfig::default());
//! let waited = limiter.admit().await;
//! assert!(waited.is_zero());
//! assert_eq!(limiter.usage().in_window, 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::RateLimitConfig;

/// Point-in-time view of the limiter's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitUsage {
    /// Calls admitted within the trailing window.
    pub in_window: usize,
    /// Admissions allowed per window before callers wait.
    pub capacity: usize,
    /// Admissions left before the next caller has to wait.
    pub remaining: usize,
}

/// Sliding-window rate limiter shared by every dispatch path.
///
/// Thread-safe via an internal `Mutex`; the lock is never held across an
/// await point.
pub struct RateLimiter {
    records: Mutex<VecDeque<Instant>>,
    window: Duration,
    max_per_window: usize,
    capacity: usize,
}

impl RateLimiter {
    /// Create a limiter from its configuration.
    ///
    /// The effective capacity is `max_per_window - admission_buffer`, clamped
    /// to at least 1 so a misconfigured buffer cannot stall every caller.
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = config
            .max_per_window
            .saturating_sub(config.admission_buffer)
            .max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            window: config.window(),
            max_per_window: config.max_per_window,
            capacity,
        }
    }

    /// Admissions allowed per window before callers wait.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a call may proceed, record it, and return the time spent
    /// waiting. Never fails.
    ///
    /// Waiters are not queued: whichever caller re-checks first after a slot
    /// frees takes it.
    pub async fn admit(&self) -> Duration {
        let started = Instant::now();
        loop {
            let wait_for = {
                let mut records = self.lock();
                let now = Instant::now();
                self.prune(&mut records, now);
                if records.len() < self.capacity {
                    records.push_back(now);
                    let waited = now.saturating_duration_since(started);
                    let in_window = records.len();
                    drop(records);
                    if waited.is_zero() {
                        debug!(in_window, capacity = self.capacity, "Call admitted");
                    } else {
                        info!(
                            in_window,
                            waited_ms = waited.as_millis() as u64,
                            "Call admitted after waiting for window capacity"
                        );
                    }
                    return waited;
                }
                // Pruning keeps only records younger than the window, so the
                // oldest one frees its slot after a strictly positive wait.
                match records.front() {
                    Some(oldest) => self
                        .window
                        .saturating_sub(now.saturating_duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };
            debug!(
                wait_ms = wait_for.as_millis() as u64,
                "Window full, waiting for capacity"
            );
            tokio::time::sleep(wait_for).await;
        }
    }

    /// Snapshot the current window without admitting anything.
    pub fn usage(&self) -> RateLimitUsage {
        let mut records = self.lock();
        self.prune(&mut records, Instant::now());
        let in_window = records.len();
        RateLimitUsage {
            in_window,
            capacity: self.capacity,
            remaining: self.capacity.saturating_sub(in_window),
        }
    }

    fn prune(&self, records: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = records.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                records.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("max_per_window", &self.max_per_window)
            .field("capacity", &self.capacity)
            .finish()
    }
}
