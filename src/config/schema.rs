//! Configuration schema definitions.
//!
//! [`LoggerOptions`] is what callers hand in: any subset of the recognized
//! options. [`LoggerConfig`] is the fully populated, immutable record the
//! middleware reads on every request.

use serde::{Deserialize, Serialize};

use crate::observability::Level;

/// Default capture cap for request and response bodies (64 KiB).
pub const DEFAULT_MAX_BODY_CAPTURE_BYTES: usize = 64 * 1024;

/// Partial configuration. Every `Some` field replaces the default wholesale.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggerOptions {
    pub level: Option<Level>,
    pub pretty_print: Option<bool>,
    pub skip_paths: Option<Vec<String>>,
    pub request_id_header: Option<String>,
    pub auto_generate_request_id: Option<bool>,
    pub redact: Option<Vec<String>>,
    pub deep_headers: Option<bool>,
    pub log_prefix: Option<String>,

    pub status_prefix_100: Option<String>,
    pub status_prefix_200: Option<String>,
    pub status_prefix_300: Option<String>,
    pub status_prefix_400: Option<String>,
    pub status_prefix_500: Option<String>,

    pub level_prefix_debug: Option<String>,
    pub level_prefix_info: Option<String>,
    pub level_prefix_warn: Option<String>,
    pub level_prefix_error: Option<String>,
    pub level_prefix_fatal: Option<String>,

    pub print_auto_logs: Option<bool>,
    pub print_manual_logs: Option<bool>,
    pub skip_preflight: Option<bool>,

    /// Upper bound on bytes of request/response body copied into log events.
    pub max_body_capture_bytes: Option<usize>,
}

/// Prefixes keyed by status category (1xx through 5xx).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPrefixes {
    pub informational: String,
    pub success: String,
    pub redirection: String,
    pub client_error: String,
    pub server_error: String,
}

impl StatusPrefixes {
    /// Prefix for the category of `status`, or `""` outside 1xx..5xx.
    pub fn for_status(&self, status: u16) -> &str {
        match crate::observability::prefix::status_category(status) {
            100 => &self.informational,
            200 => &self.success,
            300 => &self.redirection,
            400 => &self.client_error,
            500 => &self.server_error,
            _ => "",
        }
    }
}

/// Prefixes keyed by manual log level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelPrefixes {
    pub debug: String,
    pub info: String,
    pub warn: String,
    pub error: String,
    pub fatal: String,
}

impl LevelPrefixes {
    pub fn for_level(&self, level: Level) -> &str {
        match level {
            Level::Debug => &self.debug,
            Level::Info => &self.info,
            Level::Warn => &self.warn,
            Level::Error => &self.error,
            Level::Fatal => &self.fatal,
        }
    }
}

/// Resolved configuration. Created once per middleware instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Level auto logs are emitted at, and the sinks' minimum level.
    pub level: Level,

    /// Human-readable colorized output instead of JSON lines.
    pub pretty_print: bool,

    /// Exact request paths that bypass instrumentation.
    pub skip_paths: Vec<String>,

    /// Header carrying the request id, in both directions.
    pub request_id_header: String,

    /// Generate an id when absent and echo the id on the response.
    pub auto_generate_request_id: bool,

    /// Header names whose values are masked (case-insensitive).
    pub redact: Vec<String>,

    /// Log every header (`true`) or drop common browser headers (`false`).
    pub deep_headers: bool,

    pub log_prefix: String,
    pub status_prefix: StatusPrefixes,
    pub level_prefix: LevelPrefixes,

    pub print_auto_logs: bool,
    pub print_manual_logs: bool,

    /// Pass `OPTIONS` requests through untouched.
    pub skip_preflight: bool,

    pub max_body_capture_bytes: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            pretty_print: true,
            skip_paths: vec!["/health".to_string(), "/favicon.ico".to_string()],
            request_id_header: "x-request-id".to_string(),
            auto_generate_request_id: true,
            redact: vec!["authorization".to_string()],
            deep_headers: true,
            log_prefix: String::new(),
            status_prefix: StatusPrefixes::default(),
            level_prefix: LevelPrefixes::default(),
            print_auto_logs: true,
            print_manual_logs: true,
            skip_preflight: false,
            max_body_capture_bytes: DEFAULT_MAX_BODY_CAPTURE_BYTES,
        }
    }
}

impl LoggerConfig {
    /// Overlay `options` onto the defaults. Pure; never fails.
    pub fn resolve(options: LoggerOptions) -> Self {
        let d = Self::default();
        Self {
            level: options.level.unwrap_or(d.level),
            pretty_print: options.pretty_print.unwrap_or(d.pretty_print),
            skip_paths: options.skip_paths.unwrap_or(d.skip_paths),
            request_id_header: options.request_id_header.unwrap_or(d.request_id_header),
            auto_generate_request_id: options
                .auto_generate_request_id
                .unwrap_or(d.auto_generate_request_id),
            redact: options.redact.unwrap_or(d.redact),
            deep_headers: options.deep_headers.unwrap_or(d.deep_headers),
            log_prefix: options.log_prefix.unwrap_or(d.log_prefix),
            status_prefix: StatusPrefixes {
                informational: options.status_prefix_100.unwrap_or(d.status_prefix.informational),
                success: options.status_prefix_200.unwrap_or(d.status_prefix.success),
                redirection: options.status_prefix_300.unwrap_or(d.status_prefix.redirection),
                client_error: options.status_prefix_400.unwrap_or(d.status_prefix.client_error),
                server_error: options.status_prefix_500.unwrap_or(d.status_prefix.server_error),
            },
            level_prefix: LevelPrefixes {
                debug: options.level_prefix_debug.unwrap_or(d.level_prefix.debug),
                info: options.level_prefix_info.unwrap_or(d.level_prefix.info),
                warn: options.level_prefix_warn.unwrap_or(d.level_prefix.warn),
                error: options.level_prefix_error.unwrap_or(d.level_prefix.error),
                fatal: options.level_prefix_fatal.unwrap_or(d.level_prefix.fatal),
            },
            print_auto_logs: options.print_auto_logs.unwrap_or(d.print_auto_logs),
            print_manual_logs: options.print_manual_logs.unwrap_or(d.print_manual_logs),
            skip_preflight: options.skip_preflight.unwrap_or(d.skip_preflight),
            max_body_capture_bytes: options
                .max_body_capture_bytes
                .unwrap_or(d.max_body_capture_bytes),
        }
    }

    /// Whether `path` is exempt from instrumentation.
    pub fn skips_path(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|p| p == path)
    }
}

impl From<LoggerOptions> for LoggerConfig {
    fn from(options: LoggerOptions) -> Self {
        Self::resolve(options)
    }
}
