use std::sync::{Arc, Mutex};

use crate::{ErrorSink, Error};

/// Sink keeping the message of every reported error.
#[derive(Debug, Default, Clone)]
pub struct RecordingErrorSink(Arc<Mutex<Vec<String>>>);

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<String> {
        self.0.lock().map(|x| x.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.reports().len()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, error: &Error) {
        if let Ok(mut reports) = self.0.lock() {
            reports.push(error.to_string())
        }
    }
}
