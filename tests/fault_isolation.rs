//! Instrumentation failures must never reach request handling.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use request_logger::LoggerOptions;

mod common;

use common::{SinkMode, TestApp};

#[tokio::test]
async fn failing_auto_sink_does_not_block_handler() {
    let app = TestApp::with_sinks(LoggerOptions::default(), SinkMode::Fail, SinkMode::Record, |l| l);

    let (res, body) = app.get("/items").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(app.handler_calls(), 1);
    assert!(res.headers().contains_key("x-request-id"));

    let failures = app.failures();
    assert_eq!(failures.len(), 2, "one report each for [INI] and [END]: {failures:?}");
    assert!(failures.iter().all(|f| f.contains("disk full")));
    assert_eq!(app.manual.events().len(), 1);
}

#[tokio::test]
async fn panicking_sinks_are_contained() {
    let app = TestApp::with_sinks(LoggerOptions::default(), SinkMode::Panic, SinkMode::Panic, |l| l);

    let (res, body) = app.get("/items/42").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body, "no such item");
    assert_eq!(app.handler_calls(), 1);

    // [INI], manual warn, [END], [NOT_FOUND]
    let failures = app.failures();
    assert_eq!(failures.len(), 4, "{failures:?}");
    assert!(failures.iter().all(|f| f.contains("sink exploded")));
}

#[tokio::test]
async fn broken_id_generator_degrades_to_uninstrumented() {
    let app = TestApp::with_sinks(LoggerOptions::default(), SinkMode::Record, SinkMode::Record, |logger| {
        logger.with_id_generator(Arc::new(|| -> String { panic!("entropy exhausted") }))
    });

    let (res, body) = app.get("/attached").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, "false", "handler should get a detached facade");
    assert_eq!(app.handler_calls(), 1);
    assert!(!res.headers().contains_key("x-request-id"));
    assert!(app.auto.events().is_empty());
    assert!(app.manual.events().is_empty());
    assert!(app.failures()[0].contains("entropy exhausted"));
}

#[tokio::test]
async fn invalid_request_id_header_name_is_reported() {
    let app = TestApp::new(LoggerOptions {
        request_id_header: Some("not a header".into()),
        ..Default::default()
    });

    let (res, body) = app.get("/items").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(app.auto.prefixes(), vec!["[INI]", "[END]"]);
    assert_eq!(app.failures().len(), 1);
    assert!(app.failures()[0].contains("not a valid header name"));
}

#[tokio::test]
async fn failing_manual_sink_leaves_response_intact() {
    let app = TestApp::with_sinks(LoggerOptions::default(), SinkMode::Record, SinkMode::Fail, |l| l);

    let request = Request::builder()
        .uri("/attached")
        .header("x-request-id", "keep-me")
        .body(Body::empty())
        .unwrap();
    let (res, body) = app.send(request).await;

    assert_eq!(body, "true");
    assert_eq!(res.headers()["x-request-id"], "keep-me");
    assert_eq!(app.auto.prefixes(), vec!["[INI]", "[END]"]);
    assert_eq!(app.failures().len(), 1);
}

#[tokio::test]
async fn panicking_level_check_on_manual_sink_is_contained() {
    let app = TestApp::with_sinks(LoggerOptions::default(), SinkMode::Record, SinkMode::PanicOnEnabled, |l| l);

    let (res, body) = app.get("/items").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(app.handler_calls(), 1);
    assert_eq!(app.auto.prefixes(), vec!["[INI]", "[END]"]);
    assert!(app.manual.events().is_empty());

    let failures = app.failures();
    assert_eq!(failures.len(), 1, "{failures:?}");
    assert!(failures[0].contains("enabled exploded"));
}

#[tokio::test]
async fn panicking_level_check_on_auto_sink_is_contained() {
    let app = TestApp::with_sinks(LoggerOptions::default(), SinkMode::PanicOnEnabled, SinkMode::Record, |l| l);

    let (res, body) = app.get("/items").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(app.manual.prefixes(), vec![""]);
    // [INI] and [END]
    assert_eq!(app.failures().len(), 2);
}
