//! YouTube client error types.

use std::sync::Arc;

use tunecache_core::Error;

/// Errors from the YouTube metadata client.
#[derive(Debug, thiserror::Error)]
pub enum YoutubeError {
    /// Empty or otherwise unusable search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Video ids are exactly 11 characters of `[A-Za-z0-9_-]`.
    #[error("invalid video id: {0}")]
    InvalidVideoId(String),

    /// YouTube reports the video does not exist or is private.
    #[error("video not found: {0}")]
    NotFound(String),

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Page or response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for YoutubeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { YoutubeError::Timeout } else { YoutubeError::Network(Arc::new(err)) }
    }
}

impl From<YoutubeError> for Error {
    fn from(err: YoutubeError) -> Self {
        match err {
            YoutubeError::InvalidQuery(_) | YoutubeError::InvalidVideoId(_) => Error::InvalidInput(err.to_string()),
            YoutubeError::NotFound(id) => Error::NotFound(format!("video {id}")),
            YoutubeError::HttpError { status } => Error::HttpError(format!("youtube answered {status}")),
            YoutubeError::Timeout => Error::FetchTimeout("youtube request timed out".into()),
            YoutubeError::Network(e) => Error::Network(e.to_string()),
            YoutubeError::Parse(msg) => Error::UpstreamMalformed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = YoutubeError::InvalidVideoId("abc".to_string());
        assert!(err.to_string().contains("invalid video id"));

        let err = YoutubeError::HttpError { status: 503 };
        assert_eq!(err.to_string(), "HTTP error: 503");
    }

    #[test]
    fn test_into_core_status() {
        let cases = [
            (YoutubeError::InvalidQuery(String::new()), 400),
            (YoutubeError::NotFound("dQw4w9WgXcQ".into()), 404),
            (YoutubeError::HttpError { status: 500 }, 502),
            (YoutubeError::Parse("no ytInitialData".into()), 502),
            (YoutubeError::Timeout, 504),
        ];
        for (err, status) in cases {
            assert_eq!(Error::from(err).status_code(), status);
        }
    }
}
