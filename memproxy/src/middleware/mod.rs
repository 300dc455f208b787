//! Cross-cutting behaviour around a [`CacheService`].
//!
//! A concern implements [`Interceptor`] once, as a single generic `around`
//! hook, and [`Layered`] applies it to all ten operations. Layers nest:
//! `store.layer(a).layer(b)` runs `b` outermost, so `b`'s pre and post logic
//! wraps everything `a` does.

mod deadline;
mod logging;

pub use deadline::DeadlineMiddleware;
pub use logging::LoggingMiddleware;

use crate::context::Context;
use crate::domain::CacheItem;
use crate::ports::CacheService;
use async_trait::async_trait;
use shared::Result;
use std::collections::HashMap;
use std::future::Future;

/// Describes the call an interceptor is wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation<'a> {
    pub name: &'static str,
    /// `None` for multi-key operations.
    pub key: Option<&'a str>,
}

impl<'a> Operation<'a> {
    pub fn keyed(name: &'static str, key: &'a str) -> Self {
        Self { name, key: Some(key) }
    }

    pub fn unkeyed(name: &'static str) -> Self {
        Self { name, key: None }
    }
}

/// A behaviour wrapped around every cache call.
///
/// Implementations receive the pending inner call and must resolve to its
/// result; anything other than passing it through changes what callers see.
pub trait Interceptor: Send + Sync + 'static {
    fn around<'a, T, F>(
        &'a self,
        ctx: &'a Context,
        op: Operation<'a>,
        call: F,
    ) -> impl Future<Output = Result<T>> + Send + 'a
    where
        T: Send + 'a,
        F: Future<Output = Result<T>> + Send + 'a;
}

/// A cache service with an interceptor applied to each of its operations.
#[derive(Clone, Debug)]
pub struct Layered<S, I> {
    inner: S,
    interceptor: I,
}

impl<S, I> Layered<S, I> {
    pub fn new(inner: S, interceptor: I) -> Self {
        Self { inner, interceptor }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

pub trait CacheServiceExt: CacheService + Sized {
    /// Wraps `self` so that `interceptor` runs around every operation.
    fn layer<I: Interceptor>(self, interceptor: I) -> Layered<Self, I> {
        Layered::new(self, interceptor)
    }
}

impl<S: CacheService> CacheServiceExt for S {}

#[async_trait]
impl<S: CacheService, I: Interceptor> CacheService for Layered<S, I> {
    async fn add(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
        let op = Operation::keyed("Add", &item.key);
        self.interceptor.around(ctx, op, self.inner.add(ctx, item)).await
    }

    async fn compare_and_swap(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
        let op = Operation::keyed("CompareAndSwap", &item.key);
        self.interceptor
            .around(ctx, op, self.inner.compare_and_swap(ctx, item))
            .await
    }

    async fn decrement(&self, ctx: &Context, key: &str, delta: u64) -> Result<u64> {
        let op = Operation::keyed("Decrement", key);
        self.interceptor
            .around(ctx, op, self.inner.decrement(ctx, key, delta))
            .await
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        let op = Operation::keyed("Delete", key);
        self.interceptor.around(ctx, op, self.inner.delete(ctx, key)).await
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<CacheItem> {
        let op = Operation::keyed("Get", key);
        self.interceptor.around(ctx, op, self.inner.get(ctx, key)).await
    }

    async fn get_multi(&self, ctx: &Context, keys: &[String]) -> Result<HashMap<String, CacheItem>> {
        let op = Operation::unkeyed("GetMulti");
        self.interceptor
            .around(ctx, op, self.inner.get_multi(ctx, keys))
            .await
    }

    async fn increment(&self, ctx: &Context, key: &str, delta: u64) -> Result<u64> {
        let op = Operation::keyed("Increment", key);
        self.interceptor
            .around(ctx, op, self.inner.increment(ctx, key, delta))
            .await
    }

    async fn replace(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
        let op = Operation::keyed("Replace", &item.key);
        self.interceptor.around(ctx, op, self.inner.replace(ctx, item)).await
    }

    async fn set(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
        let op = Operation::keyed("Set", &item.key);
        self.interceptor.around(ctx, op, self.inner.set(ctx, item)).await
    }

    async fn touch(&self, ctx: &Context, key: &str, seconds: i32) -> Result<()> {
        let op = Operation::keyed("Touch", key);
        self.interceptor
            .around(ctx, op, self.inner.touch(ctx, key, seconds))
            .await
    }
}
