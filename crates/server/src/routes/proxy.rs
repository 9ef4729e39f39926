//! Generic passthrough proxy for resources the browser cannot fetch itself.

use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tunecache_client::canonicalize;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

/// `GET /proxy?url=`: upstream body and content type, or a JSON error.
pub async fn proxy(State(state): State<AppState>, Query(params): Query<ProxyParams>) -> Result<Response, ApiError> {
    let target = params
        .url
        .ok_or_else(|| ApiError::invalid_input("query parameter `url` is required"))?;
    let url = canonicalize(&target)?;

    let upstream = state.fetch.get_ok(url).await?;

    let content_type = upstream
        .content_type()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    Ok(([(header::CONTENT_TYPE, content_type)], upstream.body).into_response())
}
