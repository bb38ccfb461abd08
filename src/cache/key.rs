//! Canonical request identity.

use std::fmt;

use sha2::{Digest, Sha256};

/// Identifies one logical upstream request: endpoint plus parameter set.
///
/// Parameters are sorted on construction, so insertion order never changes
/// equality or hashing. Repeated keys are kept (array parameters arrive
/// pre-flattened as `ids[]=1&ids[]=2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl RequestKey {
    /// Build a canonical key. Surrounding `/` on the endpoint are dropped.
    pub fn new<I, K, V>(endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        params.sort();
        Self {
            endpoint: endpoint.trim_matches('/').to_string(),
            params,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Canonical (sorted) query parameters.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// SHA-256 hex digest of the key, for logging without leaking parameters.
    ///
    /// Uses length-prefixed encoding so `("a=b", "")` and `("a", "b")` never
    /// collide.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.endpoint.len() as u64).to_le_bytes());
        hasher.update(self.endpoint.as_bytes());
        hasher.update((self.params.len() as u64).to_le_bytes());
        for (k, v) in &self.params {
            hasher.update((k.len() as u64).to_le_bytes());
            hasher.update(k.as_bytes());
            hasher.update((v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// First 12 hex characters of [`digest`](Self::digest).
    pub fn short_digest(&self) -> String {
        let mut d = self.digest();
        d.truncate(12);
        d
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}
