//! Error types for the instrumentation layer.
//!
//! None of these ever reach the host framework. They are produced inside the
//! per-request fault boundary and handed to the fallback channel.

use thiserror::Error;

/// Failure reported by a [`LogSink`](crate::observability::LogSink).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink rejected event: {0}")]
    Rejected(String),
}

/// Anything that went wrong while instrumenting a single request.
#[derive(Debug, Error)]
pub enum InstrumentationError {
    #[error("log emission failed: {0}")]
    Sink(#[from] SinkError),

    #[error("{0:?} is not a valid header name")]
    InvalidHeaderName(String),

    #[error("request id {0:?} is not a valid header value")]
    InvalidRequestId(String),

    #[error("request body capture failed: {0}")]
    BodyCapture(String),

    #[error("instrumentation panicked during {stage}: {message}")]
    Panic { stage: &'static str, message: String },
}
