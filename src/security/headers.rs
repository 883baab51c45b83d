//! Header sanitization for log output.
//!
//! # Responsibilities
//! - Build a JSON view of the incoming headers
//! - Optionally drop common browser/transport headers
//! - Mask configured sensitive headers
//!
//! # Design Decisions
//! - Redaction runs after filtering and is idempotent
//! - Header names are compared lowercased
//! - Repeated headers become arrays; non-UTF-8 values are decoded lossily

use axum::http::HeaderMap;
use serde_json::{Map, Value};

/// Replacement value for redacted headers.
pub const REDACTED_VALUE: &str = "****";

/// Headers dropped from the log view when deep header capture is off.
pub const BROWSER_HEADERS: &[&str] = &[
    "accept",
    "accept-language",
    "accept-encoding",
    "connection",
    "host",
    "user-agent",
    "referer",
    "origin",
    "cookie",
    "upgrade-insecure-requests",
    "sec-fetch-site",
    "sec-fetch-mode",
    "sec-fetch-user",
    "sec-fetch-dest",
    "content-type",
    "content-length",
    "cache-control",
    "if-none-match",
    "if-modified-since",
    "accept-ranges",
    "pragma",
    "expires",
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
];

fn is_browser_header(name: &str) -> bool {
    BROWSER_HEADERS.contains(&name.to_ascii_lowercase().as_str())
}

/// Copy `headers` into a JSON object keyed by lowercase name.
///
/// With `deep` off, names in [`BROWSER_HEADERS`] are left out.
pub fn header_view(headers: &HeaderMap, deep: bool) -> Map<String, Value> {
    let mut view = Map::new();

    for name in headers.keys() {
        if !deep && is_browser_header(name.as_str()) {
            continue;
        }

        let mut values = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect::<Vec<_>>();

        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        view.insert(name.as_str().to_string(), value);
    }

    view
}

/// Mask every header in `view` whose name matches an entry of `redact`.
pub fn redact(view: &mut Map<String, Value>, redact: &[String]) {
    for (name, value) in view.iter_mut() {
        if redact.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            *value = Value::String(REDACTED_VALUE.to_string());
        }
    }
}

/// [`header_view`] followed by [`redact`].
pub fn sanitize(headers: &HeaderMap, deep: bool, redact_list: &[String]) -> Map<String, Value> {
    let mut view = header_view(headers, deep);
    redact(&mut view, redact_list);
    view
}
