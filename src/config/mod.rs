//! Configuration for the request layer.
//!
//! Loaded from `~/.statline/config.json` when present, then overridden by
//! `STATLINE_*` environment variables. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration apart
//! from the API key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StatlineError};

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.balldontlie.io/nfl/v1";
/// Default HTTP timeout for a single upstream call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default rolling window length.
pub const DEFAULT_WINDOW_SECS: u64 = 60;
/// Provider hard limit per window.
pub const DEFAULT_MAX_PER_WINDOW: usize = 60;
/// Headroom kept below the provider limit.
pub const DEFAULT_ADMISSION_BUFFER: usize = 5;
/// Default cache freshness window.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// Default cache capacity.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 500;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

/// Upstream API connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is joined onto.
    pub base_url: String,
    /// Bearer token sent as `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("statline/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rolling-window admission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Length of the trailing window in seconds.
    pub window_secs: u64,
    /// Provider hard limit of calls per window.
    pub max_per_window: usize,
    /// Calls held back below `max_per_window` before admissions start waiting.
    pub admission_buffer: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            admission_buffer: DEFAULT_ADMISSION_BUFFER,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached keys.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Canonical config path: `~/.statline/config.json`.
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".statline")
            .join("config.json")
    }

    /// Load from the canonical path (defaults if the file is absent),
    /// apply environment overrides, and validate.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, apply environment overrides, and validate.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Apply `STATLINE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// Blank values are ignored. Unparseable numbers are ignored as well, so
    /// a typo never replaces a valid file setting with zero.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get("STATLINE_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(key) = get("STATLINE_API_KEY") {
            self.api.api_key = Some(key);
        }
        if let Some(secs) = get("STATLINE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.api.timeout_secs = secs;
        }
        if let Some(secs) = get("STATLINE_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.cache.ttl_secs = secs;
        }
        if let Some(max) = get("STATLINE_RATE_LIMIT_MAX").and_then(|v| v.parse().ok()) {
            self.rate_limit.max_per_window = max;
        }
    }

    /// Reject settings the request layer cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            StatlineError::Config(format!("invalid base_url '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StatlineError::Config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(StatlineError::Config(
                "api.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(StatlineError::Config(
                "rate_limit.window_secs must be greater than zero".into(),
            ));
        }
        if self.rate_limit.admission_buffer >= self.rate_limit.max_per_window {
            return Err(StatlineError::Config(format!(
                "rate_limit.admission_buffer ({}) must be below max_per_window ({})",
                self.rate_limit.admission_buffer, self.rate_limit.max_per_window
            )));
        }
        Ok(())
    }

    /// Copy of the config with the API key masked, safe to print or log.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.api.api_key.is_some() {
            copy.api.api_key = Some("********".to_string());
        }
        copy
    }
}
