//! In-memory sink for unit tests.

use std::sync::Mutex;

use crate::error::SinkError;
use crate::observability::{LogEvent, LogSink};

#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
    fail: bool,
}

impl MemorySink {
    /// A sink whose every `emit` returns an error.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: &LogEvent) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Rejected("memory sink set to fail".into()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
