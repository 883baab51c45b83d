//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (pretty or JSON)
//! - Bridge [`LogEvent`]s onto `tracing` events
//! - Keep auto and manual logs on separate targets
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError};

use crate::config::LoggerConfig;
use crate::error::SinkError;
use crate::observability::{Level, LogEvent, LogSink};

/// Target carrying `[INI]`, `[END]` and `[NOT_FOUND]` events.
pub const AUTO_TARGET: &str = "request_logger::auto";
/// Target carrying events from handler code via `RequestLog`.
pub const MANUAL_TARGET: &str = "request_logger::manual";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Auto,
    Manual,
}

/// [`LogSink`] that forwards to the global tracing dispatcher.
#[derive(Debug, Clone)]
pub struct TracingSink {
    channel: Channel,
    min_level: Level,
}

impl TracingSink {
    /// Sink for instrumentation-generated events.
    pub fn auto(min_level: Level) -> Self {
        Self { channel: Channel::Auto, min_level }
    }

    /// Sink for events raised by handlers.
    pub fn manual(min_level: Level) -> Self {
        Self { channel: Channel::Manual, min_level }
    }
}

// Both target and level must be constants at the callsite, so this repeats
// the mapping of `Level::as_tracing` arm by arm.
//
// Scalar request fields are recorded as typed tracing fields. The full
// metadata object, including nested headers and payloads, is recorded once
// as its JSON encoding under `metadata`; the JSON layer writes it as a string.
macro_rules! forward {
    ($target:expr, $event:expr, $metadata:expr) => {{
        let event = $event;
        let fields = &event.metadata;
        let request_id = fields.get("request_id").and_then(|v| v.as_str()).unwrap_or_default();
        let method = fields.get("method").and_then(|v| v.as_str());
        let url = fields.get("url").and_then(|v| v.as_str());
        let status = fields.get("status").and_then(|v| v.as_u64());
        let duration = fields.get("duration").and_then(|v| v.as_u64());
        match event.level {
            Level::Debug => tracing::debug!(target: $target, request_id, method, url, status, duration, metadata = %$metadata, "{}", event.line()),
            Level::Info => tracing::info!(target: $target, request_id, method, url, status, duration, metadata = %$metadata, "{}", event.line()),
            Level::Warn => tracing::warn!(target: $target, request_id, method, url, status, duration, metadata = %$metadata, "{}", event.line()),
            Level::Error => tracing::error!(target: $target, request_id, method, url, status, duration, metadata = %$metadata, "{}", event.line()),
            Level::Fatal => tracing::error!(target: $target, severity = "fatal", request_id, method, url, status, duration, metadata = %$metadata, "{}", event.line()),
        }
    }};
}

impl LogSink for TracingSink {
    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        if !self.enabled(event.level) {
            return Ok(());
        }
        let metadata = serde_json::Value::Object(event.metadata.clone());
        match self.channel {
            Channel::Auto => forward!(AUTO_TARGET, event, metadata),
            Channel::Manual => forward!(MANUAL_TARGET, event, metadata),
        }
        Ok(())
    }
}

/// Default `EnvFilter` directive for a minimum level.
pub fn default_directive(level: Level) -> String {
    let level = level.as_tracing().as_str().to_ascii_lowercase();
    format!("request_logger={level},tower_http=warn")
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the level taken from `config`. Fails if a global
/// subscriber is already set.
pub fn init_logging(config: &LoggerConfig) -> Result<(), TryInitError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(config.level).into());

    let pretty = config.pretty_print.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });
    let json = (!config.pretty_print).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
}
