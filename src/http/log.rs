//! Request-scoped manual logging.
//!
//! Handlers take a [`RequestLog`] argument and log through it; every event
//! carries the request id of the request being handled.
//!
//! ```rust,no_run
//! use request_logger::RequestLog;
//! use serde_json::json;
//!
//! async fn create_item(log: RequestLog) -> &'static str {
//!     log.info("creating item");
//!     log.warn_with("stock low", json!({ "remaining": 2 }));
//!     "ok"
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::{Map, Value};

use crate::config::LoggerConfig;
use crate::http::request::RequestId;
use crate::observability::fallback::{guard, FallbackReporter};
use crate::observability::{prefix, Level, LogEvent, LogSink};

struct Bound {
    request_id: RequestId,
    config: Arc<LoggerConfig>,
    sink: Arc<dyn LogSink>,
    fallback: FallbackReporter,
}

/// Manual logging facade bound to one request.
///
/// A detached facade (skipped path, or instrumentation failed before it was
/// attached) accepts every call and records nothing.
#[derive(Clone, Default)]
pub struct RequestLog {
    bound: Option<Arc<Bound>>,
}

impl std::fmt::Debug for RequestLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLog")
            .field("request_id", &self.request_id())
            .finish()
    }
}

impl RequestLog {
    pub(crate) fn bound(
        request_id: RequestId,
        config: Arc<LoggerConfig>,
        sink: Arc<dyn LogSink>,
        fallback: FallbackReporter,
    ) -> Self {
        Self {
            bound: Some(Arc::new(Bound {
                request_id,
                config,
                sink,
                fallback,
            })),
        }
    }

    /// A facade that drops everything.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.bound.is_some()
    }

    /// Id of the request this facade is bound to.
    pub fn request_id(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.request_id.as_str())
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message, Value::Null);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message, Value::Null);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message, Value::Null);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message, Value::Null);
    }

    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::Fatal, message, Value::Null);
    }

    pub fn debug_with(&self, message: impl Into<String>, metadata: Value) {
        self.log(Level::Debug, message, metadata);
    }

    pub fn info_with(&self, message: impl Into<String>, metadata: Value) {
        self.log(Level::Info, message, metadata);
    }

    pub fn warn_with(&self, message: impl Into<String>, metadata: Value) {
        self.log(Level::Warn, message, metadata);
    }

    pub fn error_with(&self, message: impl Into<String>, metadata: Value) {
        self.log(Level::Error, message, metadata);
    }

    pub fn fatal_with(&self, message: impl Into<String>, metadata: Value) {
        self.log(Level::Fatal, message, metadata);
    }

    /// Emit at `level`. Object metadata is merged next to `request_id`;
    /// any other non-null value is stored under `data`.
    pub fn log(&self, level: Level, message: impl Into<String>, metadata: Value) {
        let Some(bound) = &self.bound else {
            return;
        };
        if !bound.config.print_manual_logs {
            return;
        }

        let message = message.into();
        guard(&bound.fallback, "manual log", || {
            if !bound.sink.enabled(level) {
                return Ok(());
            }
            let prefix = prefix::compose(&[
                bound.config.log_prefix.as_str(),
                bound.config.level_prefix.for_level(level),
            ]);
            let mut event = LogEvent::new(level, prefix, message)
                .with("request_id", bound.request_id.as_str());
            merge_metadata(&mut event.metadata, metadata);
            bound.sink.emit(&event)?;
            Ok(())
        });
    }
}

fn merge_metadata(target: &mut Map<String, Value>, metadata: Value) {
    match metadata {
        Value::Null => {}
        Value::Object(fields) => target.extend(fields),
        other => {
            target.insert("data".to_string(), other);
        }
    }
}

impl<S> FromRequestParts<S> for RequestLog
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<RequestLog>().cloned().unwrap_or_default())
    }
}
