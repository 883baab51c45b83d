//! Lifecycle management for the demo server.
//!
//! # Data Flow
//! ```text
//! signals.rs: Ctrl+C / SIGTERM
//!     → shutdown.rs: Shutdown::trigger
//!     → HttpServer::run stops accepting and drains
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
