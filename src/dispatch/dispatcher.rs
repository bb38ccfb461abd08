//! The single path through which the upstream API is called.
//!
//! Every fetch runs the same straight-line sequence:
//!
//! 1. build the canonical [`RequestKey`];
//! 2. return a fresh cached payload if there is one (no I/O, no admission);
//! 3. wait for rate-limit admission;
//! 4. perform the GET;
//! 5. map transport failures, non-2xx statuses and undecodable bodies to
//!    errors, caching none of them;
//! 6. store the decoded body and return it.
//!
//! Nothing is retried here. Concurrent misses on the same key each issue
//! their own call.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::metrics::DispatchMetrics;
use super::transport::{HttpTransport, Transport};
use crate::cache::{RequestKey, ResponseCache};
use crate::config::Config;
use crate::error::{Result, StatlineError};
use crate::limiter::RateLimiter;

/// Composes the response cache and the rate limiter around a [`Transport`].
///
/// Cheap to share behind an `Arc`; the limiter and cache may also be shared
/// between several dispatchers.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            transport,
            limiter,
            cache,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Wire an HTTP transport, limiter, and cache from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.api)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(RateLimiter::new(config.rate_limit.clone())),
            Arc::new(ResponseCache::from_config(&config.cache)),
        ))
    }

    /// Replace the metrics sink, e.g. to aggregate several dispatchers.
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Fetch `endpoint` with `params`, returning the decoded JSON body.
    pub async fn fetch<I, K, V>(&self, endpoint: &str, params: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.fetch_key(RequestKey::new(endpoint, params)).await
    }

    /// Fetch and deserialize the payload into `T`.
    ///
    /// The untyped payload is cached, so differently typed views of the same
    /// request share one entry. A shape mismatch is a caller-side error and
    /// is not counted in [`DispatchMetrics::failures`].
    pub async fn fetch_as<T, I, K, V>(&self, endpoint: &str, params: I) -> Result<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let key = RequestKey::new(endpoint, params);
        let endpoint = key.endpoint().to_string();
        let payload = self.fetch_key(key).await?;
        serde_json::from_value(payload).map_err(|e| StatlineError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }

    /// Fetch by an already-built key.
    pub async fn fetch_key(&self, key: RequestKey) -> Result<Value> {
        if let Some(cached) = self.cache.lookup(&key) {
            self.metrics.record_hit();
            debug!(endpoint = %key.endpoint(), key = %key.short_digest(), "Cache hit");
            return Ok(cached);
        }
        self.metrics.record_miss();
        debug!(endpoint = %key.endpoint(), key = %key.short_digest(), "Cache miss");

        let waited = self.limiter.admit().await;
        self.metrics.record_call(waited);

        match self.call(&key).await {
            Ok(payload) => {
                self.cache.store(key, payload.clone());
                Ok(payload)
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(
                    endpoint = %key.endpoint(),
                    key = %key.short_digest(),
                    error = %e,
                    "Upstream fetch failed"
                );
                Err(e)
            }
        }
    }

    async fn call(&self, key: &RequestKey) -> Result<Value> {
        let resp = self.transport.get(key.endpoint(), key.params()).await?;
        if !resp.is_success() {
            return Err(StatlineError::upstream(
                key.endpoint(),
                resp.status,
                &resp.body,
            ));
        }
        serde_json::from_str(&resp.body).map_err(|e| StatlineError::Decode {
            endpoint: key.endpoint().to_string(),
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("limiter", &self.limiter)
            .field("cache", &self.cache)
            .finish()
    }
}
