//! Moka in-memory cache implementation
//!
//! Live layer of the geo cache. Bounded by entry count, with a per-entry TTL
//! evaluated against the injected [`Clock`] on every read. Moka's own expiry
//! is configured with the same TTL so stale entries are also evicted in the
//! background.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use application::{
    error::ApplicationError,
    ports::{CachePort, CacheStats, Clock, SystemClock},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::{Expiry, future::Cache};
use tracing::{debug, instrument};

/// Default entry cap of the live layer
pub const DEFAULT_MAX_ENTRIES: u64 = 1000;

#[derive(Debug, Clone)]
struct LiveEntry {
    data: Vec<u8>,
    expires_at: DateTime<Utc>,
    ttl: Duration,
}

/// Hands each entry's own TTL to Moka; reads never extend it
struct EntryTtl;

impl Expiry<String, LiveEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &LiveEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &LiveEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based in-memory cache
pub struct MokaCache {
    cache: Cache<String, LiveEntry>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entries", &self.cache.entry_count())
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MokaCache {
    /// Create a cache with the default entry cap and the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_MAX_ENTRIES, Arc::new(SystemClock))
    }

    /// Create a cache holding at most `max_entries`, expiring against `clock`
    #[must_use]
    pub fn with_clock(max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryTtl)
            .build();

        Self {
            cache,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store a value that expires at an absolute instant
    ///
    /// Used when promoting durable hits so the promoted copy keeps the
    /// original deadline.
    pub(crate) async fn insert_until(&self, key: &str, data: Vec<u8>, expires_at: DateTime<Utc>) {
        let remaining = (expires_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return;
        }
        self.cache
            .insert(
                key.to_string(),
                LiveEntry {
                    data,
                    expires_at,
                    ttl: remaining,
                },
            )
            .await;
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Apply pending evictions so `stats().entries` is exact
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        let now = self.clock.now();
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Look up a live entry, removing it if the clock says it has expired
    async fn live(&self, key: &str) -> Option<LiveEntry> {
        let entry = self.cache.get(key).await?;
        if self.clock.now() >= entry.expires_at {
            self.cache.invalidate(key).await;
            debug!(key = %key, "Cache entry expired");
            return None;
        }
        Some(entry)
    }
}

impl Default for MokaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CachePort for MokaCache {
    #[instrument(skip(self), level = "debug")]
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        if let Some(entry) = self.live(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit");
            Ok(Some(entry.data))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss");
            Ok(None)
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        let entry = LiveEntry {
            data: value,
            expires_at: self.expires_at(ttl),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError> {
        self.cache.invalidate(key).await;
        debug!(key = %key, "Cache invalidated");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, ApplicationError> {
        let prefix = pattern.trim_end_matches('*');
        self.cache.run_pending_tasks().await;

        let keys_to_remove: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| (*k).clone())
            .collect();

        let mut count = 0u64;
        for key in keys_to_remove {
            self.cache.invalidate(&key).await;
            count += 1;
        }

        debug!(pattern = %pattern, count = count, "Pattern invalidation complete");
        Ok(count)
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool, ApplicationError> {
        Ok(self.live(key).await.is_some())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}
