use crate::context::Context;
use crate::domain::CacheItem;
use async_trait::async_trait;
use shared::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Port for a remote key-value cache.
///
/// Implementations must be safe to call concurrently; the gateway never
/// serialises access. Backends, decorators and test stubs all implement this
/// and are interchangeable.
#[async_trait]
pub trait CacheService: Send + Sync + 'static {
    /// Stores the item only if the key is not already present.
    async fn add(&self, ctx: &Context, item: &CacheItem) -> Result<()>;

    /// Stores the item only if its cas token still matches the stored one.
    async fn compare_and_swap(&self, ctx: &Context, item: &CacheItem) -> Result<()>;

    /// Saturates at zero.
    async fn decrement(&self, ctx: &Context, key: &str, delta: u64) -> Result<u64>;

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()>;

    async fn get(&self, ctx: &Context, key: &str) -> Result<CacheItem>;

    /// Misses are left out of the map rather than reported as errors.
    async fn get_multi(&self, ctx: &Context, keys: &[String]) -> Result<HashMap<String, CacheItem>>;

    /// Wraps on 64-bit overflow.
    async fn increment(&self, ctx: &Context, key: &str, delta: u64) -> Result<u64>;

    async fn replace(&self, ctx: &Context, item: &CacheItem) -> Result<()>;

    async fn set(&self, ctx: &Context, item: &CacheItem) -> Result<()>;

    async fn touch(&self, ctx: &Context, key: &str, seconds: i32) -> Result<()>;
}

macro_rules! forward_cache_service {
    ($($wrapper:ident),*) => {$(
        #[async_trait]
        impl<S: CacheService + ?Sized> CacheService for $wrapper<S> {
            async fn add(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
                (**self).add(ctx, item).await
            }

            async fn compare_and_swap(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
                (**self).compare_and_swap(ctx, item).await
            }

            async fn decrement(&self, ctx: &Context, key: &str, delta: u64) -> Result<u64> {
                (**self).decrement(ctx, key, delta).await
            }

            async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
                (**self).delete(ctx, key).await
            }

            async fn get(&self, ctx: &Context, key: &str) -> Result<CacheItem> {
                (**self).get(ctx, key).await
            }

            async fn get_multi(&self, ctx: &Context, keys: &[String]) -> Result<HashMap<String, CacheItem>> {
                (**self).get_multi(ctx, keys).await
            }

            async fn increment(&self, ctx: &Context, key: &str, delta: u64) -> Result<u64> {
                (**self).increment(ctx, key, delta).await
            }

            async fn replace(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
                (**self).replace(ctx, item).await
            }

            async fn set(&self, ctx: &Context, item: &CacheItem) -> Result<()> {
                (**self).set(ctx, item).await
            }

            async fn touch(&self, ctx: &Context, key: &str, seconds: i32) -> Result<()> {
                (**self).touch(ctx, key, seconds).await
            }
        }
    )*};
}

forward_cache_service!(Arc, Box);
