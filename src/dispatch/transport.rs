//! Outbound HTTP transport.
//!
//! `Transport` abstracts the network call for testability.
//! `HttpTransport` issues real GET requests through reqwest.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{Result, StatlineError, BODY_SNIPPET_CHARS};

/// Bytes read from a non-2xx body. Enough for the error snippet even when
/// every character takes four bytes, plus leading whitespace.
pub const ERROR_BODY_MAX_BYTES: usize = BODY_SNIPPET_CHARS * 4 + 256;

/// Raw upstream answer: status code plus undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET against the upstream API.
///
/// Implementations only fail with [`StatlineError::Transport`]; status
/// handling and body decoding belong to the dispatcher.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<HttpResponse>;
}

/// reqwest-backed transport with bearer authentication and a bounded timeout.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from the API section of the config.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|e| {
            StatlineError::Config(format!("invalid base_url '{}': {}", config.base_url, e))
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| StatlineError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            timeout: config.timeout(),
        })
    }

    /// Full URL for an endpoint, without query string.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_matches('/'))
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            return format!("request timed out after {}s", self.timeout.as_secs());
        }
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<HttpResponse> {
        let url = self.url_for(endpoint);
        debug!(url = %url, params = params.len(), "GET");

        let mut req = self
            .client
            .get(&url)
            .query(params)
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let transport_err = |e: reqwest::Error| StatlineError::Transport {
            endpoint: endpoint.to_string(),
            message: self.describe(&e),
        };

        let mut resp = req.send().await.map_err(transport_err)?;
        let status = resp.status().as_u16();
        if resp.status().is_success() {
            let body = resp.text().await.map_err(transport_err)?;
            return Ok(HttpResponse { status, body });
        }

        // Only a snippet of an error body is kept; stop reading past it.
        let mut bytes = Vec::new();
        while bytes.len() < ERROR_BODY_MAX_BYTES {
            match resp.chunk().await.map_err(transport_err)? {
                Some(chunk) => bytes.extend_from_slice(&chunk),
                None => break,
            }
        }
        bytes.truncate(ERROR_BODY_MAX_BYTES);
        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned response and hand back the raw request head.
    async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            let _ = tx.send(String::from_utf8_lossy(&head).to_string());
        });
        (format!("http://{addr}/nfl/v1"), rx)
    }

    fn api_config(base_url: &str, api_key: Option<&str>) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            timeout_secs: 2,
            ..ApiConfig::default()
        }
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_url_for_joins_without_double_slash() {
        let transport =
            HttpTransport::new(&api_config("https://api.example.com/v1/", None)).unwrap();
        assert_eq!(
            transport.url_for("/players"),
            "https://api.example.com/v1/players"
        );
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = HttpTransport::new(&api_config("not a url", None));
        assert!(matches!(result, Err(StatlineError::Config(_))));
    }

    #[test]
    fn test_empty_api_key_is_unauthenticated() {
        let transport = HttpTransport::new(&api_config("https://x.test", Some(""))).unwrap();
        assert!(format!("{transport:?}").contains("authenticated: false"));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(429, "").is_success());
    }

    #[tokio::test]
    async fn test_get_sends_query_auth_and_accept() {
        let (base, head_rx) = serve_once("200 OK", r#"{"data":[{"id":7}]}"#).await;
        let transport = HttpTransport::new(&api_config(&base, Some("test-key"))).unwrap();

        let resp = transport
            .get("players", &params(&[("search", "Mahomes")]))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, r#"{"data":[{"id":7}]}"#);

        let head = head_rx.await.unwrap().to_ascii_lowercase();
        assert!(
            head.starts_with("get /nfl/v1/players?search=mahomes http/1.1"),
            "{head}"
        );
        assert!(head.contains("authorization: bearer test-key"), "{head}");
        assert!(head.contains("accept: application/json"), "{head}");
        assert!(head.contains("user-agent: statline/"), "{head}");
    }

    #[tokio::test]
    async fn test_get_encodes_repeated_params() {
        let (base, head_rx) = serve_once("200 OK", "{}").await;
        let transport = HttpTransport::new(&api_config(&base, None)).unwrap();

        transport
            .get("stats", &params(&[("ids[]", "3"), ("ids[]", "9")]))
            .await
            .unwrap();

        let head = head_rx.await.unwrap();
        assert!(
            head.starts_with("GET /nfl/v1/stats?ids%5B%5D=3&ids%5B%5D=9 "),
            "{head}"
        );
        assert!(!head.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_get_returns_error_status_without_failing() {
        let (base, _head_rx) = serve_once("503 Service Unavailable", "try later").await;
        let transport = HttpTransport::new(&api_config(&base, None)).unwrap();

        let resp = transport.get("games", &[]).await.unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.body, "try later");
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn test_error_body_read_is_capped() {
        let body = "x".repeat(ERROR_BODY_MAX_BYTES * 8);
        let (base, _head_rx) = serve_once("500 Internal Server Error", &body).await;
        let transport = HttpTransport::new(&api_config(&base, None)).unwrap();

        let resp = transport.get("games", &[]).await.unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body.len(), ERROR_BODY_MAX_BYTES);

        let err = StatlineError::upstream("games", resp.status, &resp.body);
        match err {
            StatlineError::Upstream { body, .. } => {
                assert_eq!(body.chars().count(), BODY_SNIPPET_CHARS + 3)
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_body_is_read_whole() {
        let body = format!(r#"{{"data":"{}"}}"#, "y".repeat(ERROR_BODY_MAX_BYTES * 4));
        let (base, _head_rx) = serve_once("200 OK", &body).await;
        let transport = HttpTransport::new(&api_config(&base, None)).unwrap();

        let resp = transport.get("games", &[]).await.unwrap();
        assert_eq!(resp.body, body);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&api_config(&format!("http://{addr}"), None)).unwrap();
        let err = transport.get("players", &[]).await.unwrap_err();
        match err {
            StatlineError::Transport { endpoint, .. } => assert_eq!(endpoint, "players"),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stalled_upstream_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let mut cfg = api_config(&format!("http://{addr}"), None);
        cfg.timeout_secs = 1;
        let transport = HttpTransport::new(&cfg).unwrap();
        let err = transport.get("players", &[]).await.unwrap_err();
        match err {
            StatlineError::Transport { message, .. } => {
                assert!(message.contains("timed out"), "{message}")
            }
            other => panic!("expected Transport, got {other:?}"),
        }
        server.abort();
    }
}
