//! YouTube metadata client.
//!
//! Three lookups, all by scraping public endpoints with browser-like headers:
//!
//! - **Search**: `GET {base}/results?search_query=..`, parsed from the page's
//!   embedded `ytInitialData` JSON.
//! - **Video**: `GET {base}/oembed?url=..&format=json`. A 401, 403 or 404
//!   from oEmbed means the video is missing or private.
//! - **Embed test**: `GET {base}/embed/{id}`, checked with string heuristics
//!   for the player's blocking statuses.

pub mod error;
mod parse;
pub mod types;

pub use error::YoutubeError;
pub use parse::is_video_id;
pub use types::{EmbedCheck, SearchItem, SearchResponse, VideoInfo};

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{StatusCode, header};
use tunecache_core::AppConfig;
use tunecache_core::config::BROWSER_USER_AGENT;

/// Default base URL for YouTube.
const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Canonical watch URL handed to oEmbed, independent of `base_url`.
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default and maximum number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// YouTube client configuration.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    /// Base URL (default: https://www.youtube.com).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: desktop Chrome).
    pub user_agent: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl YoutubeConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.youtube_base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// YouTube metadata client.
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    config: YoutubeConfig,
}

impl YoutubeClient {
    pub fn new(config: YoutubeConfig) -> Result<Self, YoutubeError> {
        let mut defaults = header::HeaderMap::new();
        defaults.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
        );
        defaults.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_static("en-US,en;q=0.9"));

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(defaults)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| YoutubeError::Network(Arc::new(e)))?;

        Ok(Self { http, config })
    }

    /// Search for videos. `limit` defaults to 10 and is capped at 50.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<SearchResponse, YoutubeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(YoutubeError::InvalidQuery("query must not be empty".into()));
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

        let start = Instant::now();
        let url = format!("{}/results", self.config.base_url);
        tracing::debug!(query, limit, "searching youtube");

        let response = self.http.get(&url).query(&[("search_query", query)]).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(YoutubeError::HttpError { status: status.as_u16() });
        }

        let html = response.text().await?;
        let data = parse::initial_data(&html)?;
        let results = parse::video_results(&data, limit);

        tracing::debug!(query, results = results.len(), elapsed = ?start.elapsed(), "youtube search completed");
        Ok(SearchResponse { query: query.to_string(), results })
    }

    /// Title, author and thumbnail for one video.
    pub async fn video(&self, id: &str) -> Result<VideoInfo, YoutubeError> {
        ensure_video_id(id)?;

        let url = format!("{}/oembed", self.config.base_url);
        let watch = format!("{WATCH_URL}{id}");
        let response = self
            .http
            .get(&url)
            .query(&[("url", watch.as_str()), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(YoutubeError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(YoutubeError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        let doc: types::OEmbed =
            serde_json::from_slice(&bytes).map_err(|e| YoutubeError::Parse(format!("oembed: {e}")))?;
        Ok(VideoInfo::from_oembed(id, doc))
    }

    /// Whether the video plays in an embedded player.
    pub async fn embed_test(&self, id: &str) -> Result<EmbedCheck, YoutubeError> {
        ensure_video_id(id)?;

        let url = format!("{}/embed/{}", self.config.base_url, id);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(YoutubeError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(YoutubeError::HttpError { status: status.as_u16() });
        }

        let html = response.text().await?;
        let check = parse::embed_check(id, &html);
        tracing::debug!(id, embeddable = check.embeddable, reason = ?check.reason, "embed test");
        Ok(check)
    }

    pub fn config(&self) -> &YoutubeConfig {
        &self.config
    }
}

fn ensure_video_id(id: &str) -> Result<(), YoutubeError> {
    if is_video_id(id) { Ok(()) } else { Err(YoutubeError::InvalidVideoId(id.to_string())) }
}
