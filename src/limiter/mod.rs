//! Rolling-window rate limiting for outbound API calls.

pub mod window;

pub use window::{RateLimitUsage, RateLimiter};
