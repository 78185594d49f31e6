use std::fmt;
use std::sync::Arc;

/// Per-instance diagnostic sink.
///
/// Every entry carries the middleware name. Debug entries are emitted only
/// when the instance was configured with `debug = true`, independent of the
/// global subscriber level.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    middleware: Arc<str>,
    debug: bool,
}

impl Diagnostics {
    pub fn new(middleware: &str, debug: bool) -> Self {
        Self {
            middleware: Arc::from(middleware),
            debug,
        }
    }

    pub fn middleware(&self) -> &str {
        &self.middleware
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(middleware = %self.middleware, error = %message);
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        if self.debug {
            tracing::debug!(middleware = %self.middleware, "{}", message);
        }
    }
}
