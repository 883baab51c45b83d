//! Response body observation.
//!
//! # Responsibilities
//! - Wrap the handler's response body once per request
//! - Copy outgoing bytes (bounded) for the `[END]` event
//! - Fire `[END]` exactly once when the body has been sent
//! - Fire the finish signal (`[NOT_FOUND]` for 404) when the body is released
//!
//! # Design Decisions
//! - Frames are forwarded unchanged; observation never alters the stream
//! - The end of the body is the "sent" point: a `None` frame, an error frame,
//!   or the inner body reporting end-of-stream
//! - A body dropped before it was sent counts as aborted: no events

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use serde_json::Value;

use crate::http::middleware::RequestLogger;
use crate::http::request::{render_payload, RequestContext};
use crate::observability::fallback::guard;

/// Body decorator that reports completion of the wrapped response.
pub struct ObservedBody {
    inner: Body,
    status: u16,
    context: RequestContext,
    logger: RequestLogger,
    captured: Vec<u8>,
    truncated: bool,
}

impl ObservedBody {
    pub(crate) fn new(inner: Body, status: u16, context: RequestContext, logger: RequestLogger) -> Self {
        Self {
            inner,
            status,
            context,
            logger,
            captured: Vec::new(),
            truncated: false,
        }
    }

    fn capture(&mut self, data: &Bytes) {
        let room = self
            .logger
            .config()
            .max_body_capture_bytes
            .saturating_sub(self.captured.len());
        if data.len() > room {
            self.truncated = true;
        }
        self.captured.extend_from_slice(&data[..data.len().min(room)]);
    }

    fn payload(&self) -> Value {
        if self.truncated {
            Value::String(String::from_utf8_lossy(&self.captured).into_owned())
        } else {
            render_payload(&self.captured)
        }
    }

    fn complete(&mut self) {
        if !self.context.take_completion() {
            return;
        }
        let payload = self.payload();
        guard(self.logger.fallback(), "completion", || {
            self.logger
                .log_completion(&self.context, self.status, payload, self.truncated)
        });
    }

    fn finish(&self) {
        guard(self.logger.fallback(), "finish", || {
            self.logger.log_not_found(&self.context, self.status)
        });
    }
}

impl HttpBody for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.capture(data);
                }
                // hyper stops polling once the body reports end-of-stream.
                if this.inner.is_end_stream() {
                    this.complete();
                }
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.complete(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for ObservedBody {
    fn drop(&mut self) {
        // Empty bodies may never be polled at all.
        if !self.context.completion_logged() && self.inner.is_end_stream() {
            self.complete();
        }
        if self.context.completion_logged() {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures_util::future::poll_fn;
    use serde_json::json;

    use crate::config::{LoggerConfig, LoggerOptions};
    use crate::http::request::RequestId;
    use crate::observability::testing::MemorySink;
    use crate::observability::Level;

    fn observed(body: Body, status: u16, options: LoggerOptions) -> (ObservedBody, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let logger = RequestLogger::from_config(LoggerConfig::resolve(options)).with_auto_sink(sink.clone());
        let ctx = RequestContext::new(RequestId::new("r-1"), "GET".into(), "/items".into());
        (ObservedBody::new(body, status, ctx, logger), sink)
    }

    async fn next_frame(body: &mut ObservedBody) -> Option<Result<Frame<Bytes>, axum::Error>> {
        poll_fn(|cx| Pin::new(&mut *body).poll_frame(cx)).await
    }

    fn markers(sink: &MemorySink) -> Vec<String> {
        sink.events().iter().map(|e| e.prefix.trim_end().to_string()).collect()
    }

    #[tokio::test]
    async fn completion_fires_once_across_repeated_polls() {
        let (mut body, sink) = observed(Body::from(r#"{"ok":true}"#), 200, LoggerOptions::default());

        let frame = next_frame(&mut body).await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(br#"{"ok":true}"#));
        assert!(next_frame(&mut body).await.is_none());
        assert!(next_frame(&mut body).await.is_none());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].prefix, "[END]  ");
        assert_eq!(events[0].level, Level::Info);
        assert_eq!(events[0].metadata["response"], json!({"ok": true}));
        assert_eq!(events[0].metadata["status"], 200);
        assert_eq!(events[0].metadata["request_id"], "r-1");

        drop(body);
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn not_found_follows_completion_on_release() {
        let (mut body, sink) = observed(Body::from("missing"), 404, LoggerOptions::default());
        while next_frame(&mut body).await.is_some() {}
        drop(body);

        assert_eq!(markers(&sink), vec!["[END]", "[NOT_FOUND]"]);
        let events = sink.events();
        assert_eq!(events[0].metadata["response"], "missing");
        assert_eq!(events[1].level, Level::Error);
        assert_eq!(events[1].metadata["status"], 404);
    }

    #[tokio::test]
    async fn empty_body_completes_without_polling() {
        let (body, sink) = observed(Body::empty(), 404, LoggerOptions::default());
        drop(body);
        assert_eq!(markers(&sink), vec!["[END]", "[NOT_FOUND]"]);
        assert_eq!(sink.events()[0].metadata["response"], "");
    }

    #[tokio::test]
    async fn aborted_body_emits_nothing() {
        let stream = futures_util::stream::pending::<Result<Bytes, std::io::Error>>();
        let (body, sink) = observed(Body::from_stream(stream), 404, LoggerOptions::default());
        drop(body);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn body_error_still_completes_once() {
        let stream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"par")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let (mut body, sink) = observed(Body::from_stream(stream), 200, LoggerOptions::default());

        assert!(next_frame(&mut body).await.unwrap().is_ok());
        assert!(next_frame(&mut body).await.unwrap().is_err());
        drop(body);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metadata["response"], "par");
    }

    #[tokio::test]
    async fn capture_is_bounded_but_stream_is_not() {
        let options = LoggerOptions {
            max_body_capture_bytes: Some(4),
            ..Default::default()
        };
        let (body, sink) = observed(Body::from("0123456789"), 200, options);

        let bytes = axum::body::to_bytes(Body::new(body), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"0123456789");

        let events = sink.events();
        assert_eq!(events[0].metadata["response"], "0123");
        assert_eq!(events[0].metadata["response_truncated"], true);
    }

    #[tokio::test]
    async fn status_prefix_follows_category() {
        let options = LoggerOptions {
            log_prefix: Some("api".into()),
            status_prefix_500: Some("FAIL".into()),
            ..Default::default()
        };
        let (body, sink) = observed(Body::from("x"), 503, options);
        axum::body::to_bytes(Body::new(body), usize::MAX).await.unwrap();
        assert_eq!(sink.events()[0].prefix, "api [END] FAIL  ");
    }
}
