//! Request lifecycle instrumentation middleware.
//!
//! Mount with [`axum::middleware::from_fn_with_state`]:
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use request_logger::{LoggerOptions, RequestLogger, request_logger_middleware};
//!
//! let logger = RequestLogger::new(LoggerOptions::default());
//! let app: Router = Router::new()
//!     .route("/items", get(|| async { "[]" }))
//!     .layer(middleware::from_fn_with_state(logger, request_logger_middleware));
//! ```
//!
//! Every step runs inside the fault boundary: a failure is reported to the
//! fallback channel and the request continues as if uninstrumented.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::config::{LoggerConfig, LoggerOptions};
use crate::error::InstrumentationError;
use crate::http::log::RequestLog;
use crate::http::request::{
    capture_request_body, original_url, path_params, query_params, resolve_request_id, RequestContext,
    RequestId, RequestIdGenerator, UuidGenerator,
};
use crate::http::response::ObservedBody;
use crate::observability::fallback::{guard, guard_future, stderr_reporter, FallbackReporter};
use crate::observability::prefix::{self, END_MARKER, INI_MARKER, NOT_FOUND_MARKER};
use crate::observability::{Level, LogEvent, LogSink, TracingSink};
use crate::security::headers::sanitize;

#[derive(Clone)]
struct Shared {
    config: Arc<LoggerConfig>,
    auto_sink: Arc<dyn LogSink>,
    manual_sink: Arc<dyn LogSink>,
    ids: Arc<dyn RequestIdGenerator>,
    fallback: FallbackReporter,
}

/// Middleware state: resolved config, sinks, id generator, fallback channel.
///
/// Cheap to clone; all clones share the same immutable state.
#[derive(Clone)]
pub struct RequestLogger {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl RequestLogger {
    /// Resolve `options` over the defaults and build the middleware state.
    pub fn new(options: LoggerOptions) -> Self {
        Self::from_config(LoggerConfig::resolve(options))
    }

    /// Auto logs go to tracing at the configured level; manual logs are
    /// passed through at any level and left to the subscriber's filter.
    pub fn from_config(config: LoggerConfig) -> Self {
        let level = config.level;
        Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                auto_sink: Arc::new(TracingSink::auto(level)),
                manual_sink: Arc::new(TracingSink::manual(Level::Debug)),
                ids: Arc::new(UuidGenerator),
                fallback: stderr_reporter(),
            }),
        }
    }

    pub fn with_auto_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        Arc::make_mut(&mut self.shared).auto_sink = sink;
        self
    }

    pub fn with_manual_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        Arc::make_mut(&mut self.shared).manual_sink = sink;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn RequestIdGenerator>) -> Self {
        Arc::make_mut(&mut self.shared).ids = ids;
        self
    }

    /// Replace the stderr reporter that receives instrumentation failures.
    pub fn with_fallback(mut self, fallback: FallbackReporter) -> Self {
        Arc::make_mut(&mut self.shared).fallback = fallback;
        self
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.shared.config
    }

    pub(crate) fn fallback(&self) -> &FallbackReporter {
        &self.shared.fallback
    }

    fn skips(&self, request: &Request) -> bool {
        let config = self.config();
        config.skips_path(request.uri().path())
            || (config.skip_preflight && request.method() == Method::OPTIONS)
    }

    fn emit_auto(&self, event: LogEvent) -> Result<(), InstrumentationError> {
        if self.shared.auto_sink.enabled(event.level) {
            self.shared.auto_sink.emit(&event)?;
        }
        Ok(())
    }

    fn log_initiation(
        &self,
        ctx: &RequestContext,
        headers: Map<String, Value>,
        query: Map<String, Value>,
        params: Map<String, Value>,
        body: Value,
    ) -> Result<(), InstrumentationError> {
        let config = self.config();
        let prefix = prefix::compose(&[config.log_prefix.as_str(), INI_MARKER]);
        let event = LogEvent::new(config.level, prefix, "request started")
            .with("request_id", ctx.request_id.as_str())
            .with("method", ctx.method.as_str())
            .with("url", ctx.url.as_str())
            .with("headers", headers)
            .with("query", query)
            .with("params", params)
            .with("body", body);
        self.emit_auto(event)
    }

    pub(crate) fn log_completion(
        &self,
        ctx: &RequestContext,
        status: u16,
        response: Value,
        truncated: bool,
    ) -> Result<(), InstrumentationError> {
        let config = self.config();
        let prefix = prefix::compose(&[
            config.log_prefix.as_str(),
            END_MARKER,
            config.status_prefix.for_status(status),
        ]);
        let mut event = LogEvent::new(config.level, prefix, "request completed")
            .with("request_id", ctx.request_id.as_str())
            .with("method", ctx.method.as_str())
            .with("url", ctx.url.as_str())
            .with("status", status)
            .with("duration", ctx.elapsed_ms())
            .with("response", response);
        if truncated {
            event = event.with("response_truncated", true);
        }
        self.emit_auto(event)
    }

    pub(crate) fn log_not_found(&self, ctx: &RequestContext, status: u16) -> Result<(), InstrumentationError> {
        if status != 404 {
            return Ok(());
        }
        let config = self.config();
        let prefix = prefix::compose(&[config.log_prefix.as_str(), NOT_FOUND_MARKER]);
        let event = LogEvent::new(Level::Error, prefix, "not found")
            .with("request_id", ctx.request_id.as_str())
            .with("method", ctx.method.as_str())
            .with("url", ctx.url.as_str())
            .with("status", status)
            .with("duration", ctx.elapsed_ms());
        self.emit_auto(event)
    }

    /// Set the request-id header on the response unless the handler did.
    fn echo_request_id(&self, headers: &mut HeaderMap, id: &RequestId) -> Result<(), InstrumentationError> {
        let config = self.config();
        if !config.auto_generate_request_id {
            return Ok(());
        }
        let name = HeaderName::from_bytes(config.request_id_header.as_bytes())
            .map_err(|_| InstrumentationError::InvalidHeaderName(config.request_id_header.clone()))?;
        let value = HeaderValue::from_str(id.as_str())
            .map_err(|_| InstrumentationError::InvalidRequestId(id.to_string()))?;
        headers.entry(name).or_insert(value);
        Ok(())
    }

    /// Resolve identity, attach the facade and emit `[INI]`.
    ///
    /// Always hands the request back; the context is `None` when identity
    /// could not be established.
    async fn instrument(&self, request: Request) -> (Request, Option<RequestContext>) {
        let fallback = self.fallback();
        let config = &self.shared.config;
        let (mut parts, body) = request.into_parts();

        let context = guard(fallback, "request id", || {
            let id = resolve_request_id(&parts.headers, config, self.shared.ids.as_ref());
            Ok(RequestContext::new(id, parts.method.to_string(), original_url(&parts)))
        });
        let Some(ctx) = context else {
            return (Request::from_parts(parts, body), None);
        };

        guard(fallback, "facade", || {
            let log = RequestLog::bound(
                ctx.request_id.clone(),
                config.clone(),
                self.shared.manual_sink.clone(),
                fallback.clone(),
            );
            parts.extensions.insert(ctx.request_id.clone());
            parts.extensions.insert(log);
            Ok(())
        });

        if !config.print_auto_logs {
            return (Request::from_parts(parts, body), Some(ctx));
        }

        let params = guard_future(fallback, "path params", async {
            Ok::<_, InstrumentationError>(path_params(&mut parts).await)
        })
        .await
        .unwrap_or_default();
        let (body, captured) = capture_request_body(body, config.max_body_capture_bytes).await;
        let captured = guard(fallback, "request body", move || captured).unwrap_or(Value::Null);

        guard(fallback, "initiation", || {
            let headers = sanitize(&parts.headers, config.deep_headers, &config.redact);
            self.log_initiation(&ctx, headers, query_params(&parts.uri), params, captured)
        });

        (Request::from_parts(parts, body), Some(ctx))
    }

    /// Echo the request id and hand the body to [`ObservedBody`].
    fn observe(&self, response: Response, ctx: RequestContext) -> Response {
        let (mut parts, body) = response.into_parts();

        guard(self.fallback(), "request id header", || {
            self.echo_request_id(&mut parts.headers, &ctx.request_id)
        });

        if !self.config().print_auto_logs {
            return Response::from_parts(parts, body);
        }

        let status = parts.status.as_u16();
        let body = Body::new(ObservedBody::new(body, status, ctx, self.clone()));
        Response::from_parts(parts, body)
    }
}

/// Per-request instrumentation. The downstream handler always runs.
pub async fn request_logger_middleware(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let skip = guard(logger.fallback(), "skip check", || Ok(logger.skips(&request))).unwrap_or(true);
    if skip {
        return next.run(request).await;
    }

    let (request, context) = logger.instrument(request).await;
    let response = next.run(request).await;

    match context {
        Some(ctx) => logger.observe(response, ctx),
        None => response,
    }
}
