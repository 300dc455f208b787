use memproxy::{CacheService, CacheServiceExt, Context, DeadlineMiddleware, Endpoints, LoggingMiddleware};
use std::sync::Arc;
use std::time::Duration;

/// Server state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub endpoints: Endpoints,
    pub request_timeout: Option<Duration>,
}

impl AppState {
    /// Wraps `backend` in the gateway's decorator chain: deadlines innermost,
    /// logging outermost so timed-out calls are logged too.
    pub fn new(backend: Arc<dyn CacheService>, request_timeout: Option<Duration>) -> Self {
        let service = backend
            .layer(DeadlineMiddleware::new())
            .layer(LoggingMiddleware::new());

        Self {
            endpoints: Endpoints::new(Arc::new(service)),
            request_timeout,
        }
    }

    /// Fresh context for one inbound request.
    pub fn context(&self) -> Context {
        Context::from_timeout(self.request_timeout)
    }
}
