//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! middleware / RequestLog
//!     → prefix.rs (compose line prefixes)
//!     → LogEvent { level, prefix, message, metadata }
//!     → LogSink (auto sink or manual sink)
//!     → logging.rs TracingSink → tracing subscriber
//!
//! Instrumentation failures:
//!     → fallback.rs (stderr, never a LogSink)
//! ```
//!
//! # Design Decisions
//! - Two independent sinks: one for auto logs, one for manual logs
//! - Metadata is a JSON object so any sink can render it structurally
//! - `Fatal` is a first-class level, rendered by tracing at ERROR verbosity

pub mod fallback;
pub mod logging;
pub mod prefix;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SinkError;

pub use logging::{init_logging, TracingSink, AUTO_TARGET, MANUAL_TARGET};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// The `tracing` level this severity is rendered at.
    ///
    /// This is the one definition of the mapping. `TracingSink` mirrors it
    /// per arm because tracing macros need a constant level.
    pub fn as_tracing(&self) -> tracing::Level {
        match self {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warn => tracing::Level::WARN,
            Level::Error | Level::Fatal => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured log record handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: Level,
    pub prefix: String,
    pub message: String,
    pub metadata: Map<String, Value>,
}

impl LogEvent {
    pub fn new(level: Level, prefix: String, message: impl Into<String>) -> Self {
        Self {
            level,
            prefix,
            message: message.into(),
            metadata: Map::new(),
        }
    }

    /// Add a metadata field, replacing any previous value under `key`.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Prefix and message as one rendered line.
    pub fn line(&self) -> String {
        format!("{}{}", self.prefix, self.message)
    }
}

/// Destination for log events.
///
/// Implementations must tolerate concurrent calls from many in-flight
/// requests; each `emit` writes one complete record.
pub trait LogSink: Send + Sync {
    /// Whether events at `level` would be recorded.
    fn enabled(&self, level: Level) -> bool {
        let _ = level;
        true
    }

    fn emit(&self, event: &LogEvent) -> Result<(), SinkError>;
}
