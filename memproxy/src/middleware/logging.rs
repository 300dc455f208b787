use super::{Interceptor, Operation};
use crate::context::Context;
use shared::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Logs one event per cache call with the method, key, elapsed time and error.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for LoggingMiddleware {
    fn around<'a, T, F>(
        &'a self,
        _ctx: &'a Context,
        op: Operation<'a>,
        call: F,
    ) -> impl Future<Output = Result<T>> + Send + 'a
    where
        T: Send + 'a,
        F: Future<Output = Result<T>> + Send + 'a,
    {
        async move {
            let mut record = CallRecord::start(op);
            let result = call.await;
            record.finish(result.as_ref().err());
            result
        }
    }
}

enum Outcome {
    Pending,
    Succeeded,
    Failed(String),
}

/// Emits the log line when dropped, so calls that unwind or are cancelled
/// mid-flight are still recorded.
struct CallRecord<'a> {
    op: Operation<'a>,
    begin: Instant,
    outcome: Outcome,
}

impl<'a> CallRecord<'a> {
    fn start(op: Operation<'a>) -> Self {
        Self {
            op,
            begin: Instant::now(),
            outcome: Outcome::Pending,
        }
    }

    fn finish(&mut self, err: Option<&Error>) {
        self.outcome = match err {
            Some(e) => Outcome::Failed(e.to_string()),
            None => Outcome::Succeeded,
        };
    }
}

impl Drop for CallRecord<'_> {
    fn drop(&mut self) {
        let method = self.op.name;
        let key = self.op.key.unwrap_or("none");
        let elapsed: Duration = self.begin.elapsed();

        match &self.outcome {
            Outcome::Succeeded => info!(method, key, ?elapsed, err = "nil", "cache call completed"),
            Outcome::Failed(err) => warn!(method, key, ?elapsed, err = %err, "cache call failed"),
            Outcome::Pending => warn!(method, key, ?elapsed, err = "cancelled", "cache call abandoned"),
        }
    }
}
