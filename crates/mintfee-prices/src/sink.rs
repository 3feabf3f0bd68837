use mintfee_common::metric;
use tracing::error;

use crate::Error;

/// Receives the errors the cache absorbs while processing live updates.
pub trait ErrorSink: 'static + Send + Sync {
    fn report(&self, error: &Error);
}

/// Default sink, logs the error and counts it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: &Error) {
        error!("{}", error);
        metric!(counter[price_update_error] = 1);
    }
}
