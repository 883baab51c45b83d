//! Fallback diagnostic channel and the per-request fault boundary.
//!
//! Instrumentation failures are reported here rather than to a [`LogSink`],
//! so a broken sink cannot cascade into more failures.
//!
//! [`LogSink`]: crate::observability::LogSink

use std::any::Any;
use std::future::Future;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;

use crate::error::InstrumentationError;

/// Receives instrumentation failures.
pub type FallbackReporter = Arc<dyn Fn(&InstrumentationError) + Send + Sync>;

/// Reporter writing one line per failure to stderr.
pub fn stderr_reporter() -> FallbackReporter {
    Arc::new(|err: &InstrumentationError| {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "request_logger: instrumentation failure: {err}");
    })
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `f`, turning both `Err` and panics into a report on `reporter`.
///
/// Returns `None` when `f` failed; the caller carries on without the value.
pub fn guard<T>(
    reporter: &FallbackReporter,
    stage: &'static str,
    f: impl FnOnce() -> Result<T, InstrumentationError>,
) -> Option<T> {
    let outcome = catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(InstrumentationError::Panic {
            stage,
            message: panic_message(payload),
        })
    });
    settle(reporter, outcome)
}

/// [`guard`] for an instrumentation step that has to await.
pub async fn guard_future<T>(
    reporter: &FallbackReporter,
    stage: &'static str,
    fut: impl Future<Output = Result<T, InstrumentationError>>,
) -> Option<T> {
    let outcome = AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|payload| {
        Err(InstrumentationError::Panic {
            stage,
            message: panic_message(payload),
        })
    });
    settle(reporter, outcome)
}

fn settle<T>(reporter: &FallbackReporter, outcome: Result<T, InstrumentationError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            // A panicking reporter must not escape either.
            let _ = catch_unwind(AssertUnwindSafe(|| reporter(&err)));
            None
        }
    }
}
