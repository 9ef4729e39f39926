//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request: method and URL, nothing else.
///
/// The method is upper-cased so `get` and `GET` address the same entry.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
