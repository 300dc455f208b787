use std::time::Duration;
use tokio::time::Instant;

/// Per-request call context handed to every cache operation.
///
/// Cancellation follows the future: dropping an in-flight call aborts it.
/// The deadline is advisory until a `DeadlineMiddleware` enforces it.
#[derive(Clone, Copy, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// `None` timeout yields a context without a deadline.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map(Self::with_timeout).unwrap_or_default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
