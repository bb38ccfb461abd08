//! Response caching with canonical request keys, TTL expiry, and a capacity bound.

pub mod key;
pub mod response_cache;

pub use key::RequestKey;
pub use response_cache::{CacheStats, ResponseCache};
