//! Structured errors for the tunecache server.
//!
//! Every failure reaching a handler is rendered as
//! `{"error": CODE, "message": ...}` with the status from
//! [`Error::status_code`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tunecache_client::{UrlError, YoutubeError};
use tunecache_core::{ConfigError, Error};

/// Handler error wrapping the unified error.
#[derive(Debug)]
pub struct ApiError(pub Error);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self(Error::InvalidInput(message.into()))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<YoutubeError> for ApiError {
    fn from(err: YoutubeError) -> Self {
        Self(err.into())
    }
}

impl From<UrlError> for ApiError {
    fn from(err: UrlError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(code = self.0.code(), error = %self.0, "request failed");
        } else {
            tracing::debug!(code = self.0.code(), error = %self.0, "request rejected");
        }

        let body = ErrorBody { error: self.0.code(), message: self.0.message() };
        (status, Json(body)).into_response()
    }
}

/// Failures while assembling the application at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] Error),

    #[error(transparent)]
    Youtube(#[from] YoutubeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: Error) -> (StatusCode, serde_json::Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_timeout_is_504() {
        let (status, body) = render(Error::FetchTimeout("upstream".into())).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "FETCH_TIMEOUT");
        assert_eq!(body["message"], "upstream");
    }

    #[tokio::test]
    async fn test_upstream_failures_are_502() {
        for err in [
            Error::Network("refused".into()),
            Error::HttpError("500".into()),
            Error::UpstreamMalformed("no json".into()),
        ] {
            let (status, _) = render(err).await;
            assert_eq!(status, StatusCode::BAD_GATEWAY);
        }
    }

    #[tokio::test]
    async fn test_invalid_input_is_400() {
        let (status, body) = render(Error::InvalidInput("q is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");
    }
}
