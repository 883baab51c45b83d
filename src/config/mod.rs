//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! LoggerOptions (code, or TOML via loader.rs)
//!     → LoggerConfig::resolve (overlay onto defaults)
//!     → LoggerConfig (immutable)
//!     → shared via Arc with the middleware and every request
//! ```
//!
//! # Design Decisions
//! - Config is immutable once resolved; it lives as long as the middleware
//! - Every option has a default so callers pass only what they change
//! - No semantic validation: odd values degrade log output, never startup

pub mod loader;
pub mod schema;

pub use loader::{load_options, ConfigError};
pub use schema::{LevelPrefixes, LoggerConfig, LoggerOptions, StatusPrefixes};
