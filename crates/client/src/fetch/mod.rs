//! HTTP fetch pipeline backing the worker's network.
//!
//! ### Request shaping
//! - Browser-like defaults (desktop Chrome `User-Agent`, `Accept`,
//!   `Accept-Language`) unless the request sets its own
//! - Hop-by-hop and `Host` headers are never forwarded
//! - Max redirects: 5
//!
//! ### Response handling
//! - Any HTTP status is a response; only transport failures are errors
//! - Body is read in chunks and capped at `max_bytes`
//! - Content is decoded (gzip, brotli, deflate), so encoding and length
//!   headers are dropped from the returned response

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, Method, header};
use tunecache_core::config::BROWSER_USER_AGENT;
use tunecache_core::{AppConfig, Error, FetchRequest, FetchResponse, Network};

pub use self::url::{UrlError, canonicalize, resolve_upstream};

/// Headers meaningful only for a single connection.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: desktop Chrome)
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(10_000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Whether a header should be dropped when relaying a request upstream.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Map a reqwest failure onto the unified error.
pub(crate) fn classify_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

/// reqwest-backed HTTP client.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut defaults = header::HeaderMap::new();
        defaults.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        defaults.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_static(ACCEPT_LANGUAGE));

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(defaults)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Send a request and return whatever the upstream answered.
    ///
    /// # Errors
    ///
    /// `FetchTimeout` when the timeout elapses, `FetchTooLarge` when the
    /// body exceeds `max_bytes`, `Network` for every other transport failure.
    pub async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            if is_hop_by_hop(name)
                || name.eq_ignore_ascii_case("host")
                || name.eq_ignore_ascii_case("content-length")
                || name.eq_ignore_ascii_case("accept-encoding")
            {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder.send().await.map_err(|e| classify_error(&e))?;
        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| {
                let name = name.as_str();
                !is_hop_by_hop(name) && name != "content-length" && name != "content-encoding"
            })
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect::<Vec<_>>();

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(&e))? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::FetchTooLarge(format!("body exceeds {} bytes", self.config.max_bytes)));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(FetchResponse { status, headers, body: Bytes::from(body) })
    }

    /// GET a URL and require a 2xx answer.
    ///
    /// # Errors
    ///
    /// As [`FetchClient::send`], plus `HttpError` for a non-success status.
    pub async fn get_ok(&self, url: ::url::Url) -> Result<FetchResponse, Error> {
        let response = self.send(&FetchRequest::get(url.clone())).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("{url} answered {}", response.status)));
        }
        Ok(response)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig::default()).unwrap()
    }

    fn at(server: &MockServer, route: &str) -> ::url::Url {
        ::url::Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, BROWSER_USER_AGENT);
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_hop_by_hop() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(!is_hop_by_hop("content-type"));
    }

    #[tokio::test]
    async fn test_send_uses_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client().send(&FetchRequest::get(at(&server, "/index.html"))).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("text/html"));
        assert_eq!(response.body, Bytes::from("<html>"));

        let received = server.received_requests().await.unwrap();
        let headers = &received[0].headers;
        assert_eq!(headers.get("user-agent").unwrap(), BROWSER_USER_AGENT);
        assert_eq!(headers.get("accept-language").unwrap(), ACCEPT_LANGUAGE);
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = client().send(&FetchRequest::get(at(&server, "/missing"))).await.unwrap();
        assert_eq!(response.status, 404);

        let result = client().get_ok(at(&server, "/missing")).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client =
            FetchClient::new(FetchConfig { timeout: Duration::from_millis(100), ..Default::default() }).unwrap();
        let result = client.send(&FetchRequest::get(at(&server, "/slow"))).await;

        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig { max_bytes: 16, ..Default::default() }).unwrap();
        let result = client.send(&FetchRequest::get(at(&server, "/big"))).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let url = ::url::Url::parse("http://127.0.0.1:9/").unwrap();
        let result = client().send(&FetchRequest::get(url)).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_post_body_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/scrobble"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = FetchRequest::new("POST", at(&server, "/api/scrobble"))
            .with_header("Connection", "keep-alive")
            .with_body(Bytes::from_static(b"{}"));
        let response = client().send(&request).await.unwrap();

        assert_eq!(response.status, 204);
    }
}
