//! Test doubles shared by the unit tests in this crate.

use crate::context::Context;
use crate::domain::CacheItem;
use crate::ports::CacheService;
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Answers every call from a fixed script.
///
/// Succeeding services report counters equal to the delta for `increment`
/// and zero for `decrement`, return the key as the value for `get`, and treat
/// keys starting with `missing:` as absent from `get_multi`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedService {
    failure: Option<Error>,
    hang: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedService {
    pub fn failing(error: Error) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    /// Never completes any call.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T>(&self, ok: T) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(ok),
        }
    }
}

#[async_trait]
impl CacheService for ScriptedService {
    async fn add(&self, _ctx: &Context, _item: &CacheItem) -> Result<()> {
        self.answer(()).await
    }

    async fn compare_and_swap(&self, _ctx: &Context, _item: &CacheItem) -> Result<()> {
        self.answer(()).await
    }

    async fn decrement(&self, _ctx: &Context, _key: &str, _delta: u64) -> Result<u64> {
        self.answer(0).await
    }

    async fn delete(&self, _ctx: &Context, _key: &str) -> Result<()> {
        self.answer(()).await
    }

    async fn get(&self, _ctx: &Context, key: &str) -> Result<CacheItem> {
        self.answer(CacheItem::new(key, key.to_string())).await
    }

    async fn get_multi(&self, _ctx: &Context, keys: &[String]) -> Result<HashMap<String, CacheItem>> {
        let found = keys
            .iter()
            .filter(|key| !key.starts_with("missing:"))
            .map(|key| (key.clone(), CacheItem::new(key.as_str(), key.clone())))
            .collect();
        self.answer(found).await
    }

    async fn increment(&self, _ctx: &Context, _key: &str, delta: u64) -> Result<u64> {
        self.answer(delta).await
    }

    async fn replace(&self, _ctx: &Context, _item: &CacheItem) -> Result<()> {
        self.answer(()).await
    }

    async fn set(&self, _ctx: &Context, _item: &CacheItem) -> Result<()> {
        self.answer(()).await
    }

    async fn touch(&self, _ctx: &Context, _key: &str, _seconds: i32) -> Result<()> {
        self.answer(()).await
    }
}

/// Collects formatted `tracing` output for assertions.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).to_string()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(
            output.contains(expected),
            "log output does not contain '{expected}', got:\n{output}"
        );
    }

    /// Use with `tracing::subscriber::set_default` for thread-local capture.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(self.clone())
                .with_ansi(false),
        )
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

pub(crate) struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
