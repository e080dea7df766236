//! Header names and the header policies applied to sub-requests.

use http::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

/// Container metadata naming the index object.
pub const X_CONTAINER_META_INDEX: &str = "x-container-meta-index";
/// Container metadata naming the error page suffix.
pub const X_CONTAINER_META_ERROR: &str = "x-container-meta-error";
/// Container metadata naming the listing stylesheet object.
pub const X_CONTAINER_META_LISTING_CSS: &str = "x-container-meta-listing-css";

/// Opt-in flag for authenticated callers.
pub const X_WEB_MODE: &str = "x-web-mode";
/// Transaction id carried across every sub-request.
pub const X_TRANS_ID: &str = "x-trans-id";
/// Legacy transaction id header.
pub const X_CF_TRANS_ID: &str = "x-cf-trans-id";
/// Storage token header.
pub const X_AUTH_TOKEN: &str = "x-auth-token";

/// User agent of the metadata probe.
pub const PROBE_USER_AGENT: &str = "StaticWeb";

/// Values accepted as "true" for boolean headers.
const TRUE_VALUES: &[&str] = &["true", "1", "yes", "on", "t", "y"];

/// Whether a header value reads as boolean true.
#[must_use]
pub fn is_true(value: &HeaderValue) -> bool {
    value
        .to_str()
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            TRUE_VALUES.contains(&v.as_str())
        })
        .unwrap_or(false)
}

/// Whether the request opted in to static web behavior.
#[must_use]
pub fn web_mode(headers: &HeaderMap) -> bool {
    headers.get(X_WEB_MODE).is_some_and(is_true)
}

/// Headers for the container metadata probe: the transaction id only.
#[must_use]
pub fn probe_headers(original: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    copy_trans_id(original, &mut headers);
    headers.insert(USER_AGENT, HeaderValue::from_static(PROBE_USER_AGENT));
    headers
}

/// Headers for listing queries and error page fetches.
///
/// Keeps the transaction id and credentials. Every other client header is dropped,
/// so no `If-*` condition ever applies to these probes.
#[must_use]
pub fn internal_headers(original: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    copy_trans_id(original, &mut headers);
    if let Some(token) = original.get(X_AUTH_TOKEN) {
        headers.insert(X_AUTH_TOKEN, token.clone());
    }
    if let Some(auth) = original.get(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, auth.clone());
    }
    headers
}

fn copy_trans_id(from: &HeaderMap, to: &mut HeaderMap) {
    for name in [X_TRANS_ID, X_CF_TRANS_ID] {
        if let Some(value) = from.get(name) {
            to.insert(name, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_should_parse_true_values() {
        for value in ["true", "TRUE", "1", "yes", "On", "t", "y"] {
            assert!(is_true(&HeaderValue::from_static(value)), "{value}");
        }
        for value in ["false", "0", "", "no", "nope"] {
            assert!(!is_true(&HeaderValue::from_static(value)), "{value}");
        }
    }

    #[test]
    fn test_should_detect_web_mode() {
        assert!(web_mode(&headers(&[("x-web-mode", "true")])));
        assert!(!web_mode(&headers(&[("x-web-mode", "false")])));
        assert!(!web_mode(&HeaderMap::new()));
    }

    #[test]
    fn test_should_keep_only_trans_id_for_probe() {
        let original = headers(&[
            ("x-trans-id", "tx1"),
            ("x-auth-token", "secret"),
            ("if-match", "*"),
        ]);
        let probe = probe_headers(&original);
        assert_eq!(probe.get(X_TRANS_ID).unwrap(), "tx1");
        assert_eq!(probe.get(USER_AGENT).unwrap(), PROBE_USER_AGENT);
        assert_eq!(probe.len(), 2);
    }

    #[test]
    fn test_should_keep_credentials_for_internal_requests() {
        let original = headers(&[
            ("x-cf-trans-id", "tx2"),
            ("x-auth-token", "secret"),
            ("if-none-match", "*"),
            ("accept", "text/html"),
        ]);
        let internal = internal_headers(&original);
        assert_eq!(internal.get(X_CF_TRANS_ID).unwrap(), "tx2");
        assert_eq!(internal.get(X_AUTH_TOKEN).unwrap(), "secret");
        assert!(internal.get("if-none-match").is_none());
        assert!(internal.get("accept").is_none());
    }
}
