//! Redb embedded cache implementation
//!
//! Durable layer of the geo cache. Every entry records when it was stored
//! and when its live TTL ends. Regular reads honour the TTL; durable reads
//! ignore it and only look at the entry's age, so results stay available
//! offline after the live copy is gone.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use application::{
    error::ApplicationError,
    ports::{CachePort, CacheStats, Clock},
};
use async_trait::async_trait;
use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use tracing::{debug, instrument, warn};

const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("geo_cache");

/// Stored value with its live deadline and write time (Unix milliseconds)
#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct CacheEntry {
    pub data: Vec<u8>,
    pub expires_at: i64,
    pub stored_at: i64,
}

impl CacheEntry {
    fn encode(&self) -> Result<Vec<u8>, ApplicationError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| ApplicationError::Internal(format!("Entry serialize error: {e}")))
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        bincode::decode_from_slice(bytes, bincode::config::standard())
            .ok()
            .map(|(entry, _)| entry)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.expires_at).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn internal(context: &str) -> impl Fn(redb::Error) -> ApplicationError + '_ {
    move |e| ApplicationError::Internal(format!("{context}: {e}"))
}

fn join_error(e: tokio::task::JoinError) -> ApplicationError {
    ApplicationError::Internal(format!("Task join error: {e}"))
}

/// Redb-based persistent cache
///
/// # Auto-Recovery
///
/// If the database file is corrupted or incompatible, it is deleted and
/// recreated. Individual entries that fail to decode are treated as misses
/// and removed.
pub struct RedbCache {
    db: Arc<Database>,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for RedbCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCache")
            .field("path", &self.path)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RedbCache {
    /// Open (or create) a cache file
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened after recreation.
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self, ApplicationError> {
        let path_buf = path.as_ref().to_path_buf();
        if let Some(parent) = path_buf.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ApplicationError::Internal(format!("Failed to create cache directory: {e}"))
            })?;
        }

        let db = match Database::create(&path_buf) {
            Ok(db) => db,
            Err(e) => {
                warn!(
                    path = %path_buf.display(),
                    error = %e,
                    "Cache database corrupted or incompatible, recreating"
                );
                if path_buf.exists() {
                    fs::remove_file(&path_buf).map_err(|e| {
                        ApplicationError::Internal(format!(
                            "Failed to remove corrupted database: {e}"
                        ))
                    })?;
                }
                Database::create(&path_buf).map_err(|e| {
                    ApplicationError::Internal(format!("Failed to create Redb database: {e}"))
                })?
            },
        };

        Self::init(db, Some(path_buf), clock)
    }

    /// Create a cache backed by memory only
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Result<Self, ApplicationError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| {
                ApplicationError::Internal(format!("Failed to create in-memory Redb: {e}"))
            })?;
        Self::init(db, None, clock)
    }

    fn init(
        db: Database,
        path: Option<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApplicationError> {
        let write_txn = db.begin_write().map_err(|e| {
            ApplicationError::Internal(format!("Failed to begin write transaction: {e}"))
        })?;
        {
            let _ = write_txn.open_table(CACHE_TABLE).map_err(|e| {
                ApplicationError::Internal(format!("Failed to open cache table: {e}"))
            })?;
        }
        write_txn.commit().map_err(|e| {
            ApplicationError::Internal(format!("Failed to commit transaction: {e}"))
        })?;

        Ok(Self {
            db: Arc::new(db),
            path,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Read and decode one entry; undecodable entries are removed
    pub(crate) async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>, ApplicationError> {
        let db = self.db.clone();
        let owned_key = key.to_string();

        let raw = tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CACHE_TABLE)?;
            Ok::<_, redb::Error>(table.get(owned_key.as_str())?.map(|v| v.value().to_vec()))
        })
        .await
        .map_err(join_error)?
        .map_err(internal("Redb get error"))?;

        let Some(bytes) = raw else {
            return Ok(None);
        };
        if let Some(entry) = CacheEntry::decode(&bytes) {
            return Ok(Some(entry));
        }

        warn!(key = %key, "Dropping undecodable cache entry");
        self.invalidate(key).await?;
        Ok(None)
    }

    /// Remove entries stored more than `max_age` ago
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read or written.
    pub async fn prune(&self, max_age: Duration) -> Result<u64, ApplicationError> {
        let db = self.db.clone();
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.now_millis().saturating_sub(max_age_ms);

        let removed = tokio::task::spawn_blocking(move || {
            let stale: Vec<String> = {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(CACHE_TABLE)?;
                table
                    .iter()?
                    .filter_map(Result::ok)
                    .filter(|(_, value)| {
                        CacheEntry::decode(value.value()).is_none_or(|e| e.stored_at < cutoff)
                    })
                    .map(|(key, _)| key.value().to_string())
                    .collect()
            };

            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CACHE_TABLE)?;
                for key in &stale {
                    table.remove(key.as_str())?;
                }
            }
            write_txn.commit()?;
            Ok::<_, redb::Error>(stale.len() as u64)
        })
        .await
        .map_err(join_error)?
        .map_err(internal("Redb prune error"))?;

        if removed > 0 {
            debug!(removed, "Pruned old durable cache entries");
        }
        Ok(removed)
    }

    fn entry_count(&self) -> u64 {
        self.db
            .begin_read()
            .ok()
            .and_then(|txn| txn.open_table(CACHE_TABLE).ok())
            .and_then(|table| table.len().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CachePort for RedbCache {
    #[instrument(skip(self), level = "debug")]
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        // Expired entries stay on disk for durable reads
        let live = self
            .fetch(key)
            .await?
            .filter(|entry| self.now_millis() < entry.expires_at);

        if let Some(entry) = live {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache hit (Redb)");
            Ok(Some(entry.data))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache miss (Redb)");
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
        let now = self.now_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            data: value,
            expires_at: now.saturating_add(ttl_ms),
            stored_at: now,
        };
        let entry_bytes = entry.encode()?;

        let db = self.db.clone();
        let owned_key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CACHE_TABLE)?;
                table.insert(owned_key.as_str(), entry_bytes.as_slice())?;
            }
            write_txn.commit()?;
            Ok::<_, redb::Error>(())
        })
        .await
        .map_err(join_error)?
        .map_err(internal("Redb insert error"))?;

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache set (Redb)");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError> {
        let db = self.db.clone();
        let owned_key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CACHE_TABLE)?;
                table.remove(owned_key.as_str())?;
            }
            write_txn.commit()?;
            Ok::<_, redb::Error>(())
        })
        .await
        .map_err(join_error)?
        .map_err(internal("Redb remove error"))?;

        debug!(key = %key, "Cache invalidated (Redb)");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, ApplicationError> {
        let prefix = pattern.trim_end_matches('*').to_string();
        let db = self.db.clone();

        let count = tokio::task::spawn_blocking(move || {
            let matching: Vec<String> = {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(CACHE_TABLE)?;
                table
                    .iter()?
                    .filter_map(Result::ok)
                    .map(|(key, _)| key.value().to_string())
                    .filter(|key| key.starts_with(&prefix))
                    .collect()
            };

            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CACHE_TABLE)?;
                for key in &matching {
                    table.remove(key.as_str())?;
                }
            }
            write_txn.commit()?;
            Ok::<_, redb::Error>(matching.len() as u64)
        })
        .await
        .map_err(join_error)?
        .map_err(internal("Redb pattern invalidate error"))?;

        debug!(pattern = %pattern, count = count, "Pattern invalidation complete (Redb)");
        Ok(count)
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool, ApplicationError> {
        Ok(self
            .fetch(key)
            .await?
            .is_some_and(|entry| self.now_millis() < entry.expires_at))
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_durable_bytes(
        &self,
        key: &str,
        max_age: Duration,
    ) -> Result<Option<Vec<u8>>, ApplicationError> {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let now = self.now_millis();
        let entry = self
            .fetch(key)
            .await?
            .filter(|entry| now.saturating_sub(entry.stored_at) < max_age_ms);

        debug!(key = %key, found = entry.is_some(), "Durable lookup");
        Ok(entry.map(|entry| entry.data))
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use application::ports::{CachePortExt, ManualClock};
    use tempfile::TempDir;

    use super::*;

    fn memory_cache() -> (Arc<ManualClock>, RedbCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = RedbCache::in_memory(clock.clone()).unwrap();
        (clock, cache)
    }

    #[tokio::test]
    async fn set_and_get_value() {
        let (_, cache) = memory_cache();
        cache
            .set("route:a", &vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<Vec<i32>> = cache.get("route:a").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_but_stays_durable() {
        let (clock, cache) = memory_cache();
        cache
            .set("search:a", &"cafes", Duration::from_secs(300))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(301));

        assert!(cache.get_bytes("search:a").await.unwrap().is_none());
        assert!(!cache.exists("search:a").await.unwrap());

        let durable: Option<String> = cache
            .get_durable("search:a", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(durable.as_deref(), Some("cafes"));
    }

    #[tokio::test]
    async fn durable_read_respects_max_age() {
        let (clock, cache) = memory_cache();
        cache.set("k", &1, Duration::from_secs(60)).await.unwrap();

        clock.advance(Duration::from_secs(3599));
        assert!(
            cache
                .get_durable_bytes("k", Duration::from_secs(3600))
                .await
                .unwrap()
                .is_some()
        );

        clock.advance(Duration::from_secs(1));
        assert!(
            cache
                .get_durable_bytes("k", Duration::from_secs(3600))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn entry_carries_deadline() {
        let (clock, cache) = memory_cache();
        cache.set("k", &1, Duration::from_secs(90)).await.unwrap();

        let entry = cache.fetch("k").await.unwrap().unwrap();
        assert_eq!((entry.expires_at() - clock.now()).num_seconds(), 90);
        assert_eq!(entry.stored_at, clock.now().timestamp_millis());
    }

    #[tokio::test]
    async fn prune_removes_old_entries_only() {
        let (clock, cache) = memory_cache();
        cache.set("old", &1, Duration::from_secs(60)).await.unwrap();
        clock.advance(Duration::from_secs(7200));
        cache.set("new", &2, Duration::from_secs(60)).await.unwrap();

        let removed = cache.prune(Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 1);
        assert!(cache.fetch("old").await.unwrap().is_none());
        assert!(cache.fetch("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidate_pattern_removes_matching_keys() {
        let (_, cache) = memory_cache();
        for key in ["search:a", "search:b", "route:c"] {
            cache.set(key, &1, Duration::from_secs(60)).await.unwrap();
        }

        let count = cache.invalidate_pattern("search:*").await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.redb");
        let clock = Arc::new(ManualClock::default());

        {
            let cache = RedbCache::open(&path, clock.clone()).unwrap();
            cache
                .set("route:x", &"stored", Duration::from_secs(60))
                .await
                .unwrap();
        }

        let reopened = RedbCache::open(&path, clock).unwrap();
        let value: Option<String> = reopened.get("route:x").await.unwrap();
        assert_eq!(value.as_deref(), Some("stored"));
    }

    #[tokio::test]
    async fn corrupted_file_is_recreated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.redb");
        fs::write(&path, b"definitely not a redb file").unwrap();

        let cache = RedbCache::open(&path, Arc::new(ManualClock::default())).unwrap();
        cache.set("k", &1, Duration::from_secs(60)).await.unwrap();
        assert!(cache.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.redb");

        let cache = RedbCache::open(&path, Arc::new(ManualClock::default())).unwrap();
        assert!(path.exists());
        assert!(format!("{cache:?}").contains("cache.redb"));
    }
}
