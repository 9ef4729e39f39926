//! Request/response snapshots and the network seam.
//!
//! The worker never talks to an HTTP client directly: it hands a
//! [`FetchRequest`] to a [`Network`] implementation and gets back a fully
//! buffered [`FetchResponse`]. That keeps every strategy testable with an
//! in-process double.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use url::Url;

use crate::Error;

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// Request body, only ever set on passthrough requests.
    pub body: Option<Bytes>,
    /// Set for top-level HTML navigations.
    pub navigate: bool,
}

impl FetchRequest {
    /// Create a request with the given method and no headers.
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, headers: Vec::new(), body: None, navigate: false }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark the request as a top-level navigation.
    pub fn navigation(mut self) -> Self {
        self.navigate = true;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// True for navigations, either flagged explicitly or inferred from `Accept`.
    pub fn is_navigation(&self) -> bool {
        self.navigate || self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }
}

/// A fully buffered response snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response may be written to the cache: any 2xx except
    /// 206, since a partial body is only valid for the range that asked for it.
    pub fn is_storable(&self) -> bool {
        self.is_success() && self.status != 206
    }

    /// The `Date` header, if present and parseable as an HTTP date.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        let raw = self.header("date")?;
        DateTime::parse_from_rfc2822(raw.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Anything that can perform a request against the real network.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status, and `Err` only when no response was obtained.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}
