//! Per-request logging middleware for Axum.
//!
//! Each request gets an id, an `[INI]` event on entry, exactly one `[END]`
//! event once its response body is sent, a `[NOT_FOUND]` event for 404s, and
//! a [`RequestLog`] handlers can use for their own request-scoped events.
//! Instrumentation failures are reported to a fallback channel and never
//! reach the request pipeline.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{LoggerConfig, LoggerOptions};
pub use error::{InstrumentationError, SinkError};
pub use http::{request_logger_middleware, RequestId, RequestIdGenerator, RequestLog, RequestLogger};
pub use observability::{Level, LogEvent, LogSink, TracingSink};
