//! statline: a rate-limited, caching request layer for sports-data APIs.
//!
//! Outbound calls go through a [`Dispatcher`], which answers from the
//! [`ResponseCache`] when it can and otherwise waits for [`RateLimiter`]
//! admission before issuing the HTTP GET.
//!
//! ```no_run
//! use statline::{Config, Dispatcher};
//!
//! # async fn demo() -> statline::Result<()> {
//! let dispatcher = Dispatcher::from_config(&Config::load()?)?;
//! let players = dispatcher.fetch("players", [("search", "Mahomes")]).await?;
//! println!("{players}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod limiter;

pub use cache::{CacheStats, RequestKey, ResponseCache};
pub use config::Config;
pub use dispatch::{DispatchMetrics, Dispatcher, HttpTransport, MetricsSnapshot, Transport};
pub use error::{Result, StatlineError};
pub use limiter::{RateLimitUsage, RateLimiter};
