//! Error types for statline.
//!
//! Every failure of the request layer surfaces as a [`StatlineError`]. The
//! rate limiter and the response cache are total and never produce one;
//! only the network path and configuration loading can fail.

use thiserror::Error;

/// Maximum number of characters of an upstream response body kept in
/// [`StatlineError::Upstream`].
pub const BODY_SNIPPET_CHARS: usize = 256;

/// Errors produced by the request layer.
#[derive(Debug, Error)]
pub enum StatlineError {
    /// The network call could not complete (DNS, connection, timeout).
    #[error("transport error calling '{endpoint}': {message}")]
    Transport { endpoint: String, message: String },

    /// The call completed but the upstream answered with a non-success status.
    #[error("upstream error calling '{endpoint}': HTTP {status}: {body}")]
    Upstream {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("decode error for '{endpoint}': {message}")]
    Decode { endpoint: String, message: String },

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Filesystem error while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StatlineError {
    /// Build a [`StatlineError::Upstream`], truncating the body to a
    /// diagnostic snippet.
    pub fn upstream(endpoint: &str, status: u16, body: &str) -> Self {
        Self::Upstream {
            endpoint: endpoint.to_string(),
            status,
            body: snippet(body),
        }
    }

    /// HTTP status of an upstream failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Endpoint the failing request targeted, for request-path errors.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Upstream { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, StatlineError>;

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_keeps_short_body() {
        let err = StatlineError::upstream("players", 404, "  not found \n");
        match err {
            StatlineError::Upstream { ref body, status, .. } => {
                assert_eq!(body, "not found");
                assert_eq!(status, 404);
            }
            ref other => panic!("expected Upstream, got {other:?}"),
        }
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.endpoint(), Some("players"));
    }

    #[test]
    fn test_upstream_truncates_long_body() {
        let body = "é".repeat(BODY_SNIPPET_CHARS + 50);
        let err = StatlineError::upstream("stats", 500, &body);
        let StatlineError::Upstream { body, .. } = err else {
            panic!("expected Upstream");
        };
        assert!(body.ends_with("..."));
        assert_eq!(body.chars().count(), BODY_SNIPPET_CHARS + 3);
    }

    #[test]
    fn test_display_names_endpoint() {
        let err = StatlineError::Transport {
            endpoint: "games".into(),
            message: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("games"), "{msg}");
        assert!(msg.contains("connection refused"), "{msg}");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_config_error_has_no_endpoint() {
        let err = StatlineError::Config("bad".into());
        assert!(err.endpoint().is_none());
    }
}
