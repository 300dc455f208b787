use async_trait::async_trait;
use bytes::Bytes;
use memproxy::domain::validate_key;
use memproxy::{CacheItem, CacheService, Context};
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use shared::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::ready;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Expirations above this many seconds are absolute unix timestamps.
const MAX_RELATIVE_EXPIRATION: i32 = 60 * 60 * 24 * 30;

#[derive(Clone, Debug)]
struct Entry {
    value: Bytes,
    flags: u32,
    expiration: i32,
    cas: u64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn to_item(&self, key: &str) -> CacheItem {
        CacheItem {
            key: key.to_string(),
            value: self.value.clone(),
            flags: self.flags,
            expiration: self.expiration,
            cas_token: self.cas,
        }
    }

    /// Reads the value as a memcached counter.
    fn counter(&self) -> Option<u64> {
        std::str::from_utf8(&self.value).ok()?.trim().parse().ok()
    }
}

/// Per-entry expiry driven by the entry's own deadline.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, created_at: Instant) -> Option<Duration> {
        value.expires_at.map(|at| at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.expires_at.map(|at| at.saturating_duration_since(updated_at))
    }
}

/// Resolves a memcached expiration to a deadline: `0` never expires, negative
/// values are already expired, up to 30 days is relative, anything larger is
/// a unix timestamp.
fn deadline_for(expiration: i32, now: Instant) -> Option<Instant> {
    match expiration {
        0 => None,
        s if s < 0 => Some(now),
        s if s <= MAX_RELATIVE_EXPIRATION => Some(now + Duration::from_secs(s as u64)),
        s => {
            let remaining = (i64::from(s) - chrono::Utc::now().timestamp()).max(0);
            Some(now + Duration::from_secs(remaining as u64))
        }
    }
}

/// In-process cache with memcached semantics, backed by moka.
///
/// Conditional writes (`add`, `replace`, `compare_and_swap`) and counters go
/// through moka's per-key compute so they are atomic with respect to other
/// writers of the same key.
pub struct MokaStore {
    cache: Cache<String, Entry>,
    next_cas: AtomicU64,
}

impl MokaStore {
    /// Create a store, optionally bounded to `max_entries`
    pub fn new(max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name("memproxy").expire_after(EntryExpiry);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
            next_cas: AtomicU64::new(1),
        }
    }

    fn cas_token(&self) -> u64 {
        self.next_cas.fetch_add(1, Ordering::Relaxed)
    }

    fn entry_from(&self, item: &CacheItem) -> Entry {
        Entry {
            value: item.value.clone(),
            flags: item.flags,
            expiration: item.expiration,
            cas: self.cas_token(),
            expires_at: deadline_for(item.expiration, Instant::now()),
        }
    }

    async fn adjust(&self, key: &str, apply: impl FnOnce(u64) -> u64 + Send) -> Result<u64> {
        validate_key(key)?;
        let cas = self.cas_token();

        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing.map(|e| e.into_value()) {
                    Some(current) => match current.counter() {
                        Some(n) => Op::Put(Entry {
                            value: Bytes::from(apply(n).to_string()),
                            cas,
                            ..current
                        }),
                        None => Op::Nop,
                    },
                    None => Op::Nop,
                };
                ready(op)
            })
            .await;

        match result {
            CompResult::ReplacedWith(entry) => entry.into_value().counter().ok_or(Error::NonNumeric),
            CompResult::StillNone(_) => Err(Error::CacheMiss),
            _ => Err(Error::NonNumeric),
        }
    }
}

#[async_trait]
impl CacheService for MokaStore {
    async fn add(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        validate_key(&item.key)?;
        let fresh = self.entry_from(item);

        let result = self
            .cache
            .entry(item.key.clone())
            .and_compute_with(|existing| {
                ready(match existing {
                    Some(_) => Op::Nop,
                    None => Op::Put(fresh),
                })
            })
            .await;

        match result {
            CompResult::Inserted(_) => Ok(()),
            _ => Err(Error::NotStored),
        }
    }

    async fn compare_and_swap(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        validate_key(&item.key)?;
        let fresh = self.entry_from(item);
        let expected = item.cas_token;

        let result = self
            .cache
            .entry(item.key.clone())
            .and_compute_with(|existing| {
                ready(match existing {
                    Some(current) if current.value().cas == expected => Op::Put(fresh),
                    _ => Op::Nop,
                })
            })
            .await;

        match result {
            CompResult::ReplacedWith(_) => Ok(()),
            CompResult::StillNone(_) => Err(Error::CacheMiss),
            _ => Err(Error::CasConflict),
        }
    }

    async fn decrement(&self, _ctx: &Context, key: &str, delta: u64) -> Result<u64> {
        self.adjust(key, |n| n.saturating_sub(delta)).await
    }

    async fn delete(&self, _ctx: &Context, key: &str) -> Result<()> {
        validate_key(key)?;

        // expired entries count as absent
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                ready(match existing {
                    Some(_) => Op::Remove,
                    None => Op::Nop,
                })
            })
            .await;

        match result {
            CompResult::Removed(_) => Ok(()),
            _ => Err(Error::CacheMiss),
        }
    }

    async fn get(&self, _ctx: &Context, key: &str) -> Result<CacheItem> {
        validate_key(key)?;
        match self.cache.get(key).await {
            Some(entry) => Ok(entry.to_item(key)),
            None => Err(Error::CacheMiss), // Either doesn't exist or expired
        }
    }

    async fn get_multi(&self, _ctx: &Context, keys: &[String]) -> Result<HashMap<String, CacheItem>> {
        for key in keys {
            validate_key(key)?;
        }

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.cache.get(key).await {
                found.insert(key.clone(), entry.to_item(key));
            }
        }
        Ok(found)
    }

    async fn increment(&self, _ctx: &Context, key: &str, delta: u64) -> Result<u64> {
        self.adjust(key, |n| n.wrapping_add(delta)).await
    }

    async fn replace(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        validate_key(&item.key)?;
        let fresh = self.entry_from(item);

        let result = self
            .cache
            .entry(item.key.clone())
            .and_compute_with(|existing| {
                ready(match existing {
                    Some(_) => Op::Put(fresh),
                    None => Op::Nop,
                })
            })
            .await;

        match result {
            CompResult::ReplacedWith(_) => Ok(()),
            _ => Err(Error::NotStored),
        }
    }

    async fn set(&self, _ctx: &Context, item: &CacheItem) -> Result<()> {
        validate_key(&item.key)?;
        self.cache.insert(item.key.clone(), self.entry_from(item)).await;
        Ok(())
    }

    async fn touch(&self, _ctx: &Context, key: &str, seconds: i32) -> Result<()> {
        validate_key(key)?;

        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|existing| {
                ready(match existing {
                    Some(current) => Op::Put(Entry {
                        expiration: seconds,
                        expires_at: deadline_for(seconds, Instant::now()),
                        ..current.into_value()
                    }),
                    None => Op::Nop,
                })
            })
            .await;

        match result {
            CompResult::ReplacedWith(_) => Ok(()),
            _ => Err(Error::CacheMiss),
        }
    }
}

impl Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
