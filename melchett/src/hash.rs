//! Request fingerprinting for cache addressing.

use http::HeaderMap;
use sha2::{Digest, Sha256};

/// Hashes a request's URL and varying headers into a hex digest.
///
/// Header names and values are ASCII-lowercased before hashing and sorted, so
/// neither casing nor insertion order changes the result. Values are hashed
/// as raw bytes. Headers named in `do_not_vary` (compared case-insensitively)
/// are left out. The URL and every `name:value` pair end with a newline,
/// which header names and values cannot contain.
pub fn request_hash<S: AsRef<str>>(url: &str, headers: &HeaderMap, do_not_vary: &[S]) -> String {
    let mut pairs: Vec<Vec<u8>> = headers
        .iter()
        .filter(|(name, _)| {
            !do_not_vary
                .iter()
                .any(|excluded| excluded.as_ref().eq_ignore_ascii_case(name.as_str()))
        })
        .map(|(name, value)| {
            let mut pair = Vec::with_capacity(name.as_str().len() + value.len() + 1);
            pair.extend_from_slice(name.as_str().as_bytes());
            pair.push(b':');
            pair.extend_from_slice(&value.as_bytes().to_ascii_lowercase());
            pair
        })
        .collect();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    for pair in &pairs {
        hasher.update(pair);
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
