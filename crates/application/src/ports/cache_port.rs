//! Cache port definition
//!
//! Defines the interface for the geo cache shared by search and routing.
//! Implementations keep a short-lived live layer and may mirror every write
//! into a durable store that survives restarts and network outages.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApplicationError;

/// Cache port for storing and retrieving cached values
///
/// Implementations should be thread-safe and support async operations.
/// Values are stored as raw bytes - callers handle serialization.
#[async_trait]
pub trait CachePort: Send + Sync + std::fmt::Debug {
    /// Get a cached value by key
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired entries
    /// are removed on lookup; reads never extend an entry's lifetime.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError>;

    /// Set a cached value with a time-to-live
    ///
    /// If the key already exists, its value and TTL are replaced wholesale.
    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), ApplicationError>;

    /// Invalidate (delete) a single cache entry
    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError>;

    /// Invalidate all cache entries matching a prefix pattern (e.g. "search:*")
    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, ApplicationError>;

    /// Check if a key exists in the cache (without deserializing)
    async fn exists(&self, key: &str) -> Result<bool, ApplicationError>;

    /// Read from the durable mirror, ignoring the live TTL
    ///
    /// Returns the last value stored under `key` if it was written less than
    /// `max_age` ago. Caches without a durable layer return `None`.
    async fn get_durable_bytes(
        &self,
        _key: &str,
        _max_age: Duration,
    ) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(None)
    }

    /// Get cache statistics (hits, misses, size)
    fn stats(&self) -> CacheStats;
}

/// Extension trait for typed cache operations
///
/// Provides convenient typed get/set methods on top of the raw byte interface.
#[async_trait]
pub trait CachePortExt: CachePort {
    /// Get a typed value from cache
    async fn get<T>(&self, key: &str) -> Result<Option<T>, ApplicationError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        decode(self.get_bytes(key).await?)
    }

    /// Set a typed value in cache
    async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), ApplicationError>
    where
        T: serde::Serialize + Send + Sync,
    {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ApplicationError::Internal(format!("Cache serialization error: {e}")))?;
        self.set_bytes(key, bytes, ttl).await
    }

    /// Get a typed value from the durable mirror
    async fn get_durable<T>(
        &self,
        key: &str,
        max_age: Duration,
    ) -> Result<Option<T>, ApplicationError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        decode(self.get_durable_bytes(key, max_age).await?)
    }
}

// Blanket implementation for all CachePort implementors
impl<T: CachePort + ?Sized> CachePortExt for T {}

fn decode<T: serde::de::DeserializeOwned>(
    bytes: Option<Vec<u8>>,
) -> Result<Option<T>, ApplicationError> {
    bytes
        .map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|e| {
                ApplicationError::Internal(format!("Cache deserialization error: {e}"))
            })
        })
        .transpose()
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current number of entries
    pub entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate as a fraction (0.0 - 1.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key namespaces; search and route entries never share a prefix
pub mod namespace {
    pub const SEARCH: &str = "search";
    pub const ROUTE: &str = "route";
}

/// Generate a namespaced cache key from components
///
/// Components are hashed with blake3 so keys have a fixed length regardless
/// of query size, while the readable prefix keeps pattern invalidation
/// (`search:*`) working.
#[must_use]
pub fn cache_key(prefix: &str, components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for component in components {
        hasher.update(component.as_bytes());
        hasher.update(b"\x1f");
    }
    let hash = hasher.finalize();
    format!("{prefix}:{}", &hash.to_hex()[..32])
}

/// Standard TTL values for different cache categories
pub mod ttl {
    use std::time::Duration;

    /// Live search results (5 minutes)
    pub const SEARCH: Duration = Duration::from_secs(5 * 60);

    /// Live routes (5 minutes)
    pub const ROUTE: Duration = Duration::from_secs(5 * 60);

    /// Oldest durable value served while offline (24 hours)
    pub const DURABLE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
}
