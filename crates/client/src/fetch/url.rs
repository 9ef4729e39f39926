//! URL handling for proxy targets and intercepted paths.

use tunecache_core::Error;
use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize an absolute proxy target.
///
/// Whitespace is trimmed, the host lowercased and the fragment removed; the
/// query string is kept as given. Only `http` and `https` URLs with a host
/// are accepted: proxy targets always name their scheme.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    parsed
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve an intercepted request's path and query against the upstream origin.
///
/// `path_and_query` must be origin-relative (start with `/`); anything that
/// would escape the origin is rejected.
pub fn resolve_upstream(origin: &Url, path_and_query: &str) -> Result<Url, UrlError> {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return Err(UrlError::InvalidUrl(format!("not an origin-relative path: {path_and_query}")));
    }

    let resolved = origin
        .join(path_and_query)
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    if resolved.origin() != origin.origin() {
        return Err(UrlError::InvalidUrl(format!("{path_and_query} leaves the upstream origin")));
    }
    Ok(resolved)
}
