//! `cache-control` interpretation.
//!
//! Only the directives the cache stage acts on are surfaced: `no-cache` and
//! `max-age`. Anything else is parsed and kept but has no effect.

use std::time::Duration;

use http::Method;
use http::header::CACHE_CONTROL;
use melchett_core::ResponseRecord;

/// Parsed `cache-control` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: Vec<(String, Option<String>)>,
}

impl CacheControl {
    /// Parses a header value. Directive names are case-insensitive, values may
    /// be quoted. Malformed entries are skipped.
    pub fn parse(header: &str) -> Self {
        let directives = header
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                let (name, value) = match part.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim();
                        let value = value
                            .strip_prefix('"')
                            .and_then(|v| v.strip_suffix('"'))
                            .unwrap_or(value);
                        (name.trim(), Some(value.to_owned()))
                    }
                    None => (part, None),
                };
                if name.is_empty() {
                    return None;
                }
                Some((name.to_ascii_lowercase(), value))
            })
            .collect();
        Self { directives }
    }

    /// Parses the `cache-control` header of `response`, if any.
    pub fn from_response(response: &ResponseRecord) -> Option<Self> {
        response.header(CACHE_CONTROL.as_str()).map(Self::parse)
    }

    /// Whether `directive` is present.
    pub fn has(&self, directive: &str) -> bool {
        self.directives
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(directive))
    }

    /// `no-cache` present.
    pub fn no_cache(&self) -> bool {
        self.has("no-cache")
    }

    /// `max-age` in seconds. A non-numeric value counts as absent; an
    /// all-digit value too large for `u64` saturates.
    pub fn max_age(&self) -> Option<u64> {
        self.directives
            .iter()
            .find(|(name, _)| name == "max-age")
            .and_then(|(_, value)| value.as_deref())
            .and_then(delta_seconds)
    }
}

fn delta_seconds(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(value.parse().unwrap_or(u64::MAX))
}

/// Whether a response to a `method` request may be stored.
///
/// Requires a GET, a `cache-control` header without `no-cache`, and a
/// positive `max-age`.
pub fn is_cacheable(method: &Method, response: &ResponseRecord) -> bool {
    if *method != Method::GET {
        return false;
    }
    match CacheControl::from_response(response) {
        Some(cache_control) => {
            !cache_control.no_cache() && cache_control.max_age().is_some_and(|age| age > 0)
        }
        None => false,
    }
}

/// Time to live for `response`: `max-age` capped at `ceiling`.
///
/// Without a `cache-control` header, or without a usable `max-age`, the
/// ceiling itself is used.
pub fn cache_ttl(response: &ResponseRecord, ceiling: Duration) -> Duration {
    CacheControl::from_response(response)
        .and_then(|cache_control| cache_control.max_age())
        .map_or(ceiling, |age| Duration::from_secs(age).min(ceiling))
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue, StatusCode};
    use melchett_core::ResponseBody;

    use super::*;

    fn response(cache_control: Option<&'static str>) -> ResponseRecord {
        let mut headers = HeaderMap::new();
        if let Some(value) = cache_control {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(value));
        }
        ResponseRecord::new(StatusCode::OK, headers, ResponseBody::default())
    }

    #[test]
    fn parses_directives() {
        let parsed = CacheControl::parse("Public, MAX-AGE=\"60\", no-transform");
        assert!(parsed.has("public"));
        assert!(parsed.has("no-transform"));
        assert_eq!(parsed.max_age(), Some(60));
        assert!(!parsed.no_cache());
    }

    #[test]
    fn non_numeric_max_age_is_absent() {
        assert_eq!(CacheControl::parse("max-age=soon").max_age(), None);
    }

    #[test]
    fn oversized_max_age_saturates() {
        let huge = response(Some("max-age=99999999999999999999"));
        assert_eq!(
            CacheControl::from_response(&huge).and_then(|c| c.max_age()),
            Some(u64::MAX)
        );
        assert!(is_cacheable(&Method::GET, &huge));
        assert_eq!(cache_ttl(&huge, Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn cacheable_get_with_max_age() {
        assert!(is_cacheable(&Method::GET, &response(Some("max-age=60"))));
    }

    #[test]
    fn not_cacheable() {
        assert!(!is_cacheable(&Method::POST, &response(Some("max-age=60"))));
        assert!(!is_cacheable(&Method::GET, &response(Some("no-cache, max-age=60"))));
        assert!(!is_cacheable(&Method::GET, &response(Some("max-age=0"))));
        assert!(!is_cacheable(&Method::GET, &response(Some("private"))));
        assert!(!is_cacheable(&Method::GET, &response(None)));
    }

    #[test]
    fn ttl_is_capped_by_ceiling() {
        let ceiling = Duration::from_secs(100);
        assert_eq!(
            cache_ttl(&response(Some("max-age=60")), ceiling),
            Duration::from_secs(60)
        );
        assert_eq!(cache_ttl(&response(Some("max-age=7200")), ceiling), ceiling);
        assert_eq!(cache_ttl(&response(Some("public")), ceiling), ceiling);
        assert_eq!(cache_ttl(&response(None), ceiling), ceiling);
    }
}
