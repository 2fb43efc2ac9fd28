//! Two-layer geo cache
//!
//! Read path: live -> miss -> durable (within TTL) -> promote -> return
//! Write path: write-through to both layers
//! Durable path: durable only, ignoring TTL, bounded by entry age

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use application::{
    error::ApplicationError,
    ports::{CachePort, CacheStats},
};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{MokaCache, RedbCache};

/// Cache shared by search and routing
pub struct GeoCache {
    live: MokaCache,
    durable: RedbCache,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for GeoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoCache")
            .field("live", &self.live)
            .field("durable", &self.durable)
            .finish_non_exhaustive()
    }
}

impl GeoCache {
    #[must_use]
    pub const fn new(live: MokaCache, durable: RedbCache) -> Self {
        Self {
            live,
            durable,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn live(&self) -> &MokaCache {
        &self.live
    }

    #[must_use]
    pub const fn durable(&self) -> &RedbCache {
        &self.durable
    }

    /// Drop the live layer, as after a restart; the durable layer is untouched
    pub async fn clear_live(&self) {
        self.live.clear().await;
        debug!("Live cache layer cleared");
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl CachePort for GeoCache {
    #[instrument(skip(self), level = "debug")]
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        if let Some(value) = self.live.get_bytes(key).await? {
            debug!(key = %key, layer = "live", "Cache hit");
            self.record(true);
            return Ok(Some(value));
        }

        let entry = match self.durable.fetch(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, key = %key, "Durable layer read failed");
                None
            },
        };

        if let Some(entry) = entry {
            let expires_at = entry.expires_at();
            if self.durable.now() < expires_at {
                debug!(key = %key, layer = "durable", "Cache hit, promoting to live layer");
                self.live
                    .insert_until(key, entry.data.clone(), expires_at)
                    .await;
                self.record(true);
                return Ok(Some(entry.data));
            }
        }

        debug!(key = %key, "Cache miss (all layers)");
        self.record(false);
        Ok(None)
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError> {
        self.live.set_bytes(key, value.clone(), ttl).await?;
        if let Err(e) = self.durable.set_bytes(key, value, ttl).await {
            // The live copy is still valid; only offline fallback is lost
            warn!(error = %e, key = %key, "Failed to mirror entry into durable layer");
        }

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache set (both layers)");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError> {
        self.live.invalidate(key).await?;
        self.durable.invalidate(key).await?;
        debug!(key = %key, "Cache invalidated (both layers)");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, ApplicationError> {
        let live = self.live.invalidate_pattern(pattern).await?;
        let durable = self.durable.invalidate_pattern(pattern).await?;

        // The same key usually lives in both layers
        let count = live.max(durable);
        debug!(pattern = %pattern, live, durable, "Pattern invalidation complete");
        Ok(count)
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool, ApplicationError> {
        if self.live.exists(key).await? {
            return Ok(true);
        }
        self.durable.exists(key).await
    }

    async fn get_durable_bytes(
        &self,
        key: &str,
        max_age: Duration,
    ) -> Result<Option<Vec<u8>>, ApplicationError> {
        self.durable.get_durable_bytes(key, max_age).await
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.durable.stats().entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use application::ports::{CachePortExt, Clock, ManualClock};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::cache::DEFAULT_MAX_ENTRIES;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Place {
        name: String,
    }

    fn place(name: &str) -> Place {
        Place {
            name: name.to_string(),
        }
    }

    fn cache() -> (Arc<ManualClock>, GeoCache) {
        let clock = Arc::new(ManualClock::default());
        let shared: Arc<dyn Clock> = clock.clone();
        let cache = GeoCache::new(
            MokaCache::with_clock(DEFAULT_MAX_ENTRIES, shared.clone()),
            RedbCache::in_memory(shared).unwrap(),
        );
        (clock, cache)
    }

    #[tokio::test]
    async fn write_through_reaches_both_layers() {
        let (_, cache) = cache();
        cache
            .set("search:a", &place("Flore"), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.live().exists("search:a").await.unwrap());
        assert!(cache.durable().exists("search:a").await.unwrap());
    }

    #[tokio::test]
    async fn live_miss_is_promoted_from_durable() {
        let (clock, cache) = cache();
        cache
            .set("search:a", &place("Flore"), Duration::from_secs(300))
            .await
            .unwrap();
        cache.clear_live().await;
        clock.advance(Duration::from_secs(100));

        let value: Option<Place> = cache.get("search:a").await.unwrap();
        assert_eq!(value, Some(place("Flore")));
        assert!(cache.live().exists("search:a").await.unwrap());

        // The promoted copy keeps the original deadline
        clock.advance(Duration::from_secs(201));
        assert!(!cache.live().exists("search:a").await.unwrap());
        assert!(cache.get_bytes("search:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_everywhere_is_a_miss_but_durable_read_works() {
        let (clock, cache) = cache();
        cache
            .set("route:r", &place("Louvre"), Duration::from_secs(300))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(301));

        assert!(cache.get_bytes("route:r").await.unwrap().is_none());
        let durable: Option<Place> = cache
            .get_durable("route:r", Duration::from_secs(86_400))
            .await
            .unwrap();
        assert_eq!(durable, Some(place("Louvre")));
    }

    #[tokio::test]
    async fn invalidate_clears_both_layers() {
        let (_, cache) = cache();
        cache
            .set("search:a", &place("Flore"), Duration::from_secs(60))
            .await
            .unwrap();
        cache.invalidate("search:a").await.unwrap();

        assert!(!cache.exists("search:a").await.unwrap());
        assert!(
            cache
                .get_durable_bytes("search:a", Duration::from_secs(3600))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn pattern_invalidation_keeps_other_namespace() {
        let (_, cache) = cache();
        cache.set("search:a", &1, Duration::from_secs(60)).await.unwrap();
        cache.set("search:b", &2, Duration::from_secs(60)).await.unwrap();
        cache.set("route:c", &3, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.invalidate_pattern("search:*").await.unwrap(), 2);
        assert!(cache.exists("route:c").await.unwrap());
    }

    #[tokio::test]
    async fn stats_count_each_lookup_once() {
        let (_, cache) = cache();
        cache.set("k", &1, Duration::from_secs(60)).await.unwrap();

        let _: Option<i32> = cache.get("k").await.unwrap();
        let _: Option<i32> = cache.get("missing").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
