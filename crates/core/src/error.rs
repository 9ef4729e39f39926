//! Unified error types for tunecache.
//!
//! Every variant renders with a stable code prefix so that log lines and
//! JSON error bodies can be matched on without parsing prose.

use tokio_rusqlite::rusqlite;

/// Unified error types for the tunecache worker and proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty search query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Connection, DNS or transport failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Upstream answered with a non-success status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Upstream answered but the body could not be understood.
    #[error("UPSTREAM_MALFORMED: {0}")]
    UpstreamMalformed(String),

    /// Upstream reports the resource does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Lifecycle operation called out of order.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),
}

impl Error {
    /// Stable error code, as used in the display prefix.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::CacheMiss(_) => "CACHE_MISS",
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => "CACHE_ERROR",
            Error::Network(_) => "NETWORK_ERROR",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::HttpError(_) => "HTTP_ERROR",
            Error::UpstreamMalformed(_) => "UPSTREAM_MALFORMED",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidState(_) => "INVALID_STATE",
        }
    }

    /// HTTP status reported to callers of the proxy.
    ///
    /// Upstream failures map to 502, upstream timeouts to 504.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => 400,
            Error::CacheMiss(_) | Error::NotFound(_) => 404,
            Error::InvalidState(_) => 409,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => 500,
            Error::Network(_) | Error::FetchTooLarge(_) | Error::HttpError(_) | Error::UpstreamMalformed(_) => 502,
            Error::FetchTimeout(_) => 504,
        }
    }

    /// True for failures of the network path, as opposed to local storage or input.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_) | Error::HttpError(_)
        )
    }

    /// Message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Error::InvalidInput(msg)
            | Error::InvalidUrl(msg)
            | Error::CacheMiss(msg)
            | Error::MigrationFailed(msg)
            | Error::CorruptEntry(msg)
            | Error::Network(msg)
            | Error::FetchTimeout(msg)
            | Error::FetchTooLarge(msg)
            | Error::HttpError(msg)
            | Error::UpstreamMalformed(msg)
            | Error::NotFound(msg)
            | Error::InvalidState(msg) => msg.clone(),
            Error::Database(e) => e.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}
