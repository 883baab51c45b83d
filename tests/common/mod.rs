//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, Response, StatusCode},
    middleware,
    routing::get,
    Router,
};
use request_logger::observability::fallback::FallbackReporter;
use request_logger::{
    request_logger_middleware, InstrumentationError, Level, LogEvent, LogSink, LoggerOptions,
    RequestLog, RequestLogger, SinkError,
};
use tower::ServiceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Record,
    Fail,
    Panic,
    /// Panics from `enabled` rather than `emit`.
    PanicOnEnabled,
}

/// Sink collecting events in memory, or misbehaving on demand.
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
    mode: SinkMode,
}

impl MemorySink {
    pub fn new(mode: SinkMode) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            mode,
        })
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Trimmed prefixes, in emission order.
    pub fn prefixes(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.prefix.trim_end().to_string())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn enabled(&self, _level: Level) -> bool {
        if self.mode == SinkMode::PanicOnEnabled {
            panic!("enabled exploded");
        }
        true
    }

    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        match self.mode {
            SinkMode::Record => {
                self.events.lock().unwrap().push(event.clone());
                Ok(())
            }
            SinkMode::Fail => Err(SinkError::Io(std::io::Error::other("disk full"))),
            SinkMode::Panic | SinkMode::PanicOnEnabled => panic!("sink exploded"),
        }
    }
}

#[derive(Clone, Default)]
pub struct TestState {
    pub calls: Arc<AtomicUsize>,
}

/// Everything a test needs to drive requests and inspect what was logged.
pub struct TestApp {
    pub router: Router,
    pub auto: Arc<MemorySink>,
    pub manual: Arc<MemorySink>,
    pub failures: Arc<Mutex<Vec<String>>>,
    pub state: TestState,
}

impl TestApp {
    pub fn new(options: LoggerOptions) -> Self {
        Self::with_sinks(options, SinkMode::Record, SinkMode::Record, |logger| logger)
    }

    pub fn with_sinks(
        options: LoggerOptions,
        auto_mode: SinkMode,
        manual_mode: SinkMode,
        customize: impl FnOnce(RequestLogger) -> RequestLogger,
    ) -> Self {
        let auto = MemorySink::new(auto_mode);
        let manual = MemorySink::new(manual_mode);
        let failures = Arc::new(Mutex::new(Vec::new()));

        let seen = failures.clone();
        let fallback: FallbackReporter = Arc::new(move |err: &InstrumentationError| {
            seen.lock().unwrap().push(err.to_string());
        });

        let logger = customize(
            RequestLogger::new(options)
                .with_auto_sink(auto.clone())
                .with_manual_sink(manual.clone())
                .with_fallback(fallback),
        );

        let state = TestState::default();
        let router = routes(state.clone())
            .layer(middleware::from_fn_with_state(logger, request_logger_middleware));

        Self {
            router,
            auto,
            manual,
            failures,
            state,
        }
    }

    /// Send `request` and read the whole body, as a client would.
    pub async fn send(&self, request: Request<Body>) -> (Response<()>, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (
            Response::from_parts(parts, ()),
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    pub async fn get(&self, uri: &str) -> (Response<()>, String) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub fn handler_calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

fn routes(state: TestState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/items", get(items).post(echo).options(preflight))
        .route("/items/{id}", get(item))
        .route("/created", get(created))
        .route("/attached", get(attached))
        .fallback(fallback)
        .with_state(state)
}

async fn health(State(state): State<TestState>, log: RequestLog) -> &'static str {
    state.calls.fetch_add(1, Ordering::SeqCst);
    log.info("health probe");
    "ok"
}

async fn items(State(state): State<TestState>, log: RequestLog) -> String {
    state.calls.fetch_add(1, Ordering::SeqCst);
    log.info("hi");
    r#"{"ok":true}"#.to_string()
}

async fn echo(State(state): State<TestState>, body: String) -> String {
    state.calls.fetch_add(1, Ordering::SeqCst);
    body
}

async fn preflight(State(state): State<TestState>) -> StatusCode {
    state.calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn item(
    State(state): State<TestState>,
    log: RequestLog,
    Path(id): Path<String>,
) -> (StatusCode, String) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    if id == "1" {
        (StatusCode::OK, "widget".to_string())
    } else {
        log.warn_with("unknown item", serde_json::json!({ "id": id }));
        (StatusCode::NOT_FOUND, "no such item".to_string())
    }
}

async fn created(State(state): State<TestState>) -> (StatusCode, &'static str) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::CREATED, "made")
}

async fn attached(State(state): State<TestState>, log: RequestLog) -> String {
    state.calls.fetch_add(1, Ordering::SeqCst);
    log.error("checking facade");
    log.is_attached().to_string()
}

async fn fallback(State(state): State<TestState>) -> (StatusCode, &'static str) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, "No matching route found")
}
