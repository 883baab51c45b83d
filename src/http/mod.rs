//! HTTP instrumentation subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware/request_logger.rs (skip check, fault boundary)
//!     → request.rs (request id, query/params/body snapshot)
//!     → log.rs (RequestLog attached to extensions)
//!     → [INI] event
//!     → downstream handler
//!     → response.rs (ObservedBody: [END] once, [NOT_FOUND] on release)
//!     → Send to client
//! ```

pub mod log;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use log::RequestLog;
pub use middleware::{request_logger_middleware, RequestLogger};
pub use request::{RequestId, RequestIdGenerator, UuidGenerator};
pub use response::ObservedBody;
pub use server::HttpServer;
