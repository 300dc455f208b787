use super::{Interceptor, Operation};
use crate::context::Context;
use shared::{Error, Result};
use std::future::Future;
use tokio::time::timeout_at;

/// Fails a call with `DeadlineExceeded` once the context deadline passes,
/// dropping the in-flight backend call.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadlineMiddleware;

impl DeadlineMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for DeadlineMiddleware {
    fn around<'a, T, F>(
        &'a self,
        ctx: &'a Context,
        _op: Operation<'a>,
        call: F,
    ) -> impl Future<Output = Result<T>> + Send + 'a
    where
        T: Send + 'a,
        F: Future<Output = Result<T>> + Send + 'a,
    {
        let deadline = ctx.deadline();
        async move {
            match deadline {
                Some(deadline) => timeout_at(deadline, call)
                    .await
                    .unwrap_or(Err(Error::DeadlineExceeded)),
                None => call.await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{CacheServiceExt, LoggingMiddleware};
    use crate::ports::CacheService;
    use crate::testing::{LogCapture, ScriptedService};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_hits_deadline() {
        let service = ScriptedService::default().hanging().layer(DeadlineMiddleware::new());
        let ctx = Context::with_timeout(Duration::from_millis(50));

        assert_eq!(service.get(&ctx, "k").await, Err(Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_no_deadline_passes_through() {
        let service = ScriptedService::default().layer(DeadlineMiddleware::new());
        assert_eq!(service.increment(&Context::new(), "n", 4).await, Ok(4));
    }

    #[tokio::test]
    async fn test_fast_call_within_deadline_is_untouched() {
        let service = ScriptedService::failing(Error::CasConflict).layer(DeadlineMiddleware::new());
        let ctx = Context::with_timeout(Duration::from_secs(5));
        let item = crate::domain::CacheItem::new("k", "v").with_cas_token(1);

        assert_eq!(service.compare_and_swap(&ctx, &item).await, Err(Error::CasConflict));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outer_logging_sees_deadline_error() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let service = ScriptedService::default()
            .hanging()
            .layer(DeadlineMiddleware::new())
            .layer(LoggingMiddleware::new());
        let ctx = Context::with_timeout(Duration::from_millis(20));

        let result = service.delete(&ctx, "k").await;

        assert_eq!(result, Err(Error::DeadlineExceeded));
        capture.assert_contains("err=deadline exceeded");
    }
}
