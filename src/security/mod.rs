//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request headers:
//!     → headers.rs (filter browser headers, mask sensitive values)
//!     → [INI] event metadata
//! ```
//!
//! # Design Decisions
//! - Sensitive values never reach a sink unmasked
//! - Masking happens on a copy; the request itself is untouched

pub mod headers;

pub use headers::{sanitize, BROWSER_HEADERS, REDACTED_VALUE};
