//! Request identity and the per-request snapshot used by log events.
//!
//! # Responsibilities
//! - Resolve the request id (reuse incoming header or generate a UUID)
//! - Hold per-request state: id, method, URL, start time, one-shot flag
//! - Extract query and path parameters for the `[INI]` event
//! - Copy a bounded request body without disturbing the handler
//!
//! # Design Decisions
//! - Request id resolved as early as possible so every event carries it
//! - Request state travels with the request, never in globals
//! - Bodies of unknown or oversized length are not buffered

use std::fmt;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, OriginalUri, Query, RawPathParams};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use futures_util::FutureExt;
use hyper::body::Body as HttpBody;
use std::panic::AssertUnwindSafe;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::LoggerConfig;
use crate::error::InstrumentationError;
use crate::observability::fallback::panic_message;

/// Identity of a single request, shared by every event it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh request ids.
pub trait RequestIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Generates UUID v4 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl RequestIdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> RequestIdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Reuse the configured header verbatim, else generate when enabled.
///
/// Yields an empty id when the header is absent and generation is off.
pub fn resolve_request_id(
    headers: &HeaderMap,
    config: &LoggerConfig,
    generator: &dyn RequestIdGenerator,
) -> RequestId {
    match headers.get(config.request_id_header.as_str()) {
        Some(value) => RequestId(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        None if config.auto_generate_request_id => RequestId(generator.generate()),
        None => RequestId::default(),
    }
}

/// Per-request state threaded from the middleware into the response body.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: String,
    pub url: String,
    started: Instant,
    completion_logged: bool,
}

impl RequestContext {
    pub fn new(request_id: RequestId, method: String, url: String) -> Self {
        Self {
            request_id,
            method,
            url,
            started: Instant::now(),
            completion_logged: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns `true` exactly once; every later call returns `false`.
    pub fn take_completion(&mut self) -> bool {
        !std::mem::replace(&mut self.completion_logged, true)
    }

    pub fn completion_logged(&self) -> bool {
        self.completion_logged
    }
}

/// URL as the client sent it, before any nesting stripped a prefix.
pub fn original_url(parts: &Parts) -> String {
    parts
        .extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.to_string())
        .unwrap_or_else(|| parts.uri.to_string())
}

/// Decoded query string. Repeated keys collect into arrays.
pub fn query_params(uri: &Uri) -> Map<String, Value> {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();

    let mut query = Map::new();
    for (key, value) in pairs {
        match query.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                query.insert(key, Value::String(value));
            }
        }
    }
    query
}

/// Path parameters of the matched route; empty when nothing matched.
pub async fn path_params(parts: &mut Parts) -> Map<String, Value> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
        Err(_) => Map::new(),
    }
}

/// JSON value when `bytes` parse as JSON, the raw text otherwise.
pub fn render_payload(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Copy the request body for logging and hand back an equivalent body.
///
/// Only bodies whose length is known and within `limit` are buffered; others
/// pass through untouched and log as `null`. A body that fails mid-read is
/// replaced by one yielding the same error, so the handler sees the failure
/// it would have seen anyway. A body that panics mid-read is replaced by one
/// yielding an error.
pub async fn capture_request_body(
    body: Body,
    limit: usize,
) -> (Body, Result<Value, InstrumentationError>) {
    let hint = body.size_hint();
    let within_limit = matches!(hint.upper(), Some(n) if n > 0 && n <= limit as u64);
    if !within_limit {
        return (body, Ok(Value::Null));
    }

    let read = AssertUnwindSafe(axum::body::to_bytes(body, limit)).catch_unwind().await;
    match read {
        Ok(Ok(bytes)) => {
            let rendered = render_payload(&bytes);
            (Body::from(bytes), Ok(rendered))
        }
        Ok(Err(err)) => {
            let message = err.to_string();
            (replay_error(err), Err(InstrumentationError::BodyCapture(message)))
        }
        Err(payload) => {
            let err = axum::Error::new(std::io::Error::other("request body panicked while reading"));
            let failure = InstrumentationError::Panic {
                stage: "request body",
                message: panic_message(payload),
            };
            (replay_error(err), Err(failure))
        }
    }
}

fn replay_error(err: axum::Error) -> Body {
    Body::from_stream(futures_util::stream::once(async move { Err::<Bytes, _>(err) }))
}
