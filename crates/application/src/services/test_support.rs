//! Shared fakes for service tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use domain::PlaceResult;
use parking_lot::Mutex;

use crate::error::ApplicationError;
use crate::ports::{CachePort, CacheStats, PlaceSearchPort, PlaceSearchRequest};

/// In-memory cache with a separate durable map and no expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    live: Mutex<HashMap<String, Vec<u8>>>,
    durable: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// Put a value only in the durable map, as after a restart
    pub fn seed_durable_only<T: serde::Serialize>(&self, key: &str, value: &T) {
        let bytes = serde_json::to_vec(value).unwrap();
        self.durable.lock().insert(key.to_string(), bytes);
    }

    pub fn clear_live(&self) {
        self.live.lock().clear();
    }

    pub fn live_keys(&self) -> Vec<String> {
        self.live.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl CachePort for MemoryCache {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(self.live.lock().get(key).cloned())
    }

    async fn set_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<(), ApplicationError> {
        self.durable.lock().insert(key.to_string(), value.clone());
        self.live.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError> {
        self.live.lock().remove(key);
        Ok(())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, ApplicationError> {
        let prefix = pattern.trim_end_matches('*');
        let mut live = self.live.lock();
        let before = live.len();
        live.retain(|k, _| !k.starts_with(prefix));
        Ok((before - live.len()) as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool, ApplicationError> {
        Ok(self.live.lock().contains_key(key))
    }

    async fn get_durable_bytes(
        &self,
        key: &str,
        _max_age: Duration,
    ) -> Result<Option<Vec<u8>>, ApplicationError> {
        Ok(self.durable.lock().get(key).cloned())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.live.lock().len() as u64,
            ..Default::default()
        }
    }
}

/// Search provider with a fixed answer and an artificial delay
#[derive(Debug)]
pub struct StubProvider {
    name: &'static str,
    results: Vec<PlaceResult>,
    delay: Duration,
    by_query: HashMap<String, (Vec<PlaceResult>, Duration)>,
}

impl StubProvider {
    pub fn new(name: &'static str, results: Vec<PlaceResult>) -> Self {
        Self {
            name,
            results,
            delay: Duration::ZERO,
            by_query: HashMap::new(),
        }
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer a specific query differently
    pub fn respond_to(mut self, query: &str, results: Vec<PlaceResult>, delay: Duration) -> Self {
        self.by_query.insert(query.to_string(), (results, delay));
        self
    }
}

#[async_trait]
impl PlaceSearchPort for StubProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(
        &self,
        request: &PlaceSearchRequest,
    ) -> Result<Vec<PlaceResult>, ApplicationError> {
        let (results, delay) = self
            .by_query
            .get(&request.query)
            .cloned()
            .unwrap_or_else(|| (self.results.clone(), self.delay));
        tokio::time::sleep(delay).await;
        Ok(results)
    }
}
