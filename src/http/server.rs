//! Demo HTTP server with the request logger mounted.
//!
//! # Responsibilities
//! - Create an Axum Router with a handful of sample handlers
//! - Wire up middleware (request timeout, request logger)
//! - Serve until the shutdown signal fires

use std::time::Duration;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;

use crate::http::log::RequestLog;
use crate::http::middleware::{request_logger_middleware, RequestLogger};

/// HTTP server hosting the demo routes.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(logger: RequestLogger, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(logger, request_timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(logger: RequestLogger, request_timeout: Duration) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/items", get(list_items).post(create_item))
            .route("/items/{id}", get(get_item))
            .fallback(not_found)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(middleware::from_fn_with_state(logger, request_logger_middleware))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn list_items(log: RequestLog) -> Json<Value> {
    log.debug("listing items");
    Json(json!([{ "id": "1", "name": "widget" }]))
}

async fn create_item(log: RequestLog, Json(item): Json<Value>) -> impl IntoResponse {
    log.info_with("item created", json!({ "item": item }));
    (StatusCode::CREATED, Json(item))
}

async fn get_item(log: RequestLog, Path(id): Path<String>) -> impl IntoResponse {
    if id == "1" {
        return (StatusCode::OK, Json(json!({ "id": "1", "name": "widget" })));
    }
    log.warn_with("unknown item", json!({ "id": id }));
    (StatusCode::NOT_FOUND, Json(json!({ "error": "item not found" })))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "No matching route found")
}
