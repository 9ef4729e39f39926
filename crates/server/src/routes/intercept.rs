//! Intercepting route.
//!
//! Requests that match no named route are resolved against the upstream
//! origin and handed to the worker's router; `GET /fetch?url=` does the same
//! for absolute cross-origin URLs. Requests the router declines are relayed
//! to the network unchanged. Every response carries `x-tunecache-source`.

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tunecache_client::{canonicalize, is_hop_by_hop, resolve_upstream};
use tunecache_core::{Disposition, FetchRequest, FetchResponse};
use url::Url;

use crate::{ApiError, AppState};

pub const SOURCE_HEADER: &str = "x-tunecache-source";
const PASSTHROUGH: &str = "passthrough";

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub url: Option<String>,
}

/// Fallback handler for same-origin requests.
pub async fn intercept(
    State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes,
) -> Response {
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    match resolve_upstream(&state.upstream, path) {
        Ok(url) => dispatch(&state, build_request(&method, url, &headers, body)).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// `GET /fetch?url=`: route an absolute URL through the worker.
pub async fn fetch_absolute(
    State(state): State<AppState>, Query(params): Query<FetchParams>, headers: HeaderMap,
) -> Result<Response, ApiError> {
    let target = params
        .url
        .ok_or_else(|| ApiError::invalid_input("query parameter `url` is required"))?;
    let url = canonicalize(&target)?;
    Ok(dispatch(&state, build_request(&Method::GET, url, &headers, Bytes::new())).await)
}

async fn dispatch(state: &AppState, request: FetchRequest) -> Response {
    match state.worker.router().handle(&request).await {
        Disposition::Respond { response, source } => into_response(response, source.as_str()),
        Disposition::Passthrough => match state.fetch.send(&request).await {
            Ok(response) => into_response(response, PASSTHROUGH),
            Err(e) => ApiError(e).into_response(),
        },
    }
}

/// Snapshot the incoming request for the worker.
pub(crate) fn build_request(method: &Method, url: Url, headers: &HeaderMap, body: Bytes) -> FetchRequest {
    let mut request = FetchRequest::new(method.as_str(), url);
    for (name, value) in headers {
        if is_hop_by_hop(name.as_str()) || *name == axum::http::header::HOST {
            continue;
        }
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let navigate = headers
        .get("sec-fetch-mode")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|mode| mode.eq_ignore_ascii_case("navigate"));
    if navigate {
        request = request.navigation();
    }

    if !body.is_empty() {
        request = request.with_body(body);
    }
    request
}

fn into_response(response: FetchResponse, source: &'static str) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            headers.append(name, value);
        }
    }
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(source));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:5173/library").unwrap()
    }

    #[test]
    fn test_build_request_navigation_from_fetch_mode() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));

        let request = build_request(&Method::GET, url(), &headers, Bytes::new());

        assert!(request.navigate);
        assert!(request.is_navigation());
    }

    #[test]
    fn test_build_request_navigation_from_accept() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("text/html,*/*"));

        let request = build_request(&Method::GET, url(), &headers, Bytes::new());

        assert!(!request.navigate);
        assert!(request.is_navigation());
    }

    #[test]
    fn test_build_request_drops_connection_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("host", HeaderValue::from_static("localhost:3001"));
        headers.insert("x-requested-with", HeaderValue::from_static("player"));

        let request = build_request(&Method::POST, url(), &headers, Bytes::from_static(b"{}"));

        assert_eq!(request.method, "POST");
        assert_eq!(request.headers, vec![("x-requested-with".to_string(), "player".to_string())]);
        assert_eq!(request.body, Some(Bytes::from_static(b"{}")));
    }

    #[test]
    fn test_into_response_tags_source() {
        let response = FetchResponse::new(200, "body")
            .with_header("Content-Type", "text/css")
            .with_header("Transfer-Encoding", "chunked");

        let out = into_response(response, "cache");

        assert_eq!(out.status(), StatusCode::OK);
        assert_eq!(out.headers()[SOURCE_HEADER], "cache");
        assert_eq!(out.headers()["content-type"], "text/css");
        assert!(out.headers().get("transfer-encoding").is_none());
    }
}
