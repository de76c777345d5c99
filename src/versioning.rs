//! Resolution of the API version requested by a client.
//!
//! Clients pick a version through the `Accept` header, e.g.
//! `Accept: application/json; version=2.0`. When no version is requested
//! (or the parameter is malformed) the configured default applies. Outside
//! of a request there is no version at all, which callers must tolerate.

use axum::http::{header, HeaderMap};
use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"version=(\d+\.\d+)").expect("version pattern is valid"));

/// Extracts the API version to serialize responses with.
///
/// Built once at startup from the configured `DEFAULT_API_VERSION` and
/// cloned into the shared state; it holds no per-request state.
#[derive(Clone, Debug)]
pub struct VersionResolver {
    default_version: String,
}

impl VersionResolver {
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            default_version: default_version.into(),
        }
    }

    /// Resolves the version for the request owning `headers`.
    ///
    /// Returns `None` only when there is no request at all. With a request,
    /// the first `version=<major>.<minor>` occurrence in the `Accept` header
    /// wins, captured verbatim; a missing or non-matching header falls back
    /// to the configured default. Never fails.
    pub fn resolve(&self, headers: Option<&HeaderMap>) -> Option<String> {
        let headers = headers?;

        if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) {
            if let Some(caps) = VERSION_RE.captures(accept) {
                return Some(caps[1].to_string());
            }
        }

        Some(self.default_version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, value.parse().unwrap());
        headers
    }

    #[test]
    fn no_request_resolves_to_none() {
        let resolver = VersionResolver::new("1.0");
        assert_eq!(resolver.resolve(None), None);

        let other = VersionResolver::new("9.9");
        assert_eq!(other.resolve(None), None);
    }

    #[test]
    fn missing_accept_header_falls_back_to_default() {
        let resolver = VersionResolver::new("1.4");
        let headers = HeaderMap::new();
        assert_eq!(resolver.resolve(Some(&headers)), Some("1.4".to_string()));
    }

    #[test]
    fn version_parameter_wins_over_default() {
        let resolver = VersionResolver::new("1.0");
        let headers = headers_with_accept("application/json; version=2.0");
        assert_eq!(resolver.resolve(Some(&headers)), Some("2.0".to_string()));
    }

    #[test]
    fn accept_without_version_parameter_falls_back() {
        let resolver = VersionResolver::new("1.0");
        let headers = headers_with_accept("application/json");
        assert_eq!(resolver.resolve(Some(&headers)), Some("1.0".to_string()));
    }

    #[test]
    fn multi_digit_components_and_trailing_parameters() {
        let resolver = VersionResolver::new("1.0");
        let headers = headers_with_accept("foo/bar; version=10.25; charset=utf-8");
        assert_eq!(resolver.resolve(Some(&headers)), Some("10.25".to_string()));
    }

    #[test]
    fn malformed_version_value_falls_back() {
        let resolver = VersionResolver::new("3.1");
        let headers = headers_with_accept("application/json; version=abc");
        assert_eq!(resolver.resolve(Some(&headers)), Some("3.1".to_string()));
    }

    #[test]
    fn first_match_wins_when_several_candidates_appear() {
        let resolver = VersionResolver::new("1.0");
        let headers = headers_with_accept("application/json; version=2.0, text/html; version=3.0");
        assert_eq!(resolver.resolve(Some(&headers)), Some("2.0".to_string()));
    }

    #[test]
    fn resolution_is_idempotent_within_a_request() {
        let resolver = VersionResolver::new("1.0");
        let headers = headers_with_accept("application/json; version=2.0");
        let first = resolver.resolve(Some(&headers));
        let second = resolver.resolve(Some(&headers));
        assert_eq!(first, second);
    }
}
