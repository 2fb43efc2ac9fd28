//! Search orchestration
//!
//! Resolves a free-text query plus filters into a ranked list of places:
//! cache first, then each backend in order under a short timeout, then the
//! durable store. The orchestrator never returns an error; when nothing can
//! answer it reports `SearchStatus::Unavailable` with an empty list.
//!
//! Every call takes a generation number. Only the newest call may publish its
//! results to subscribers, so a slow response can never overwrite a newer one.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use domain::{DistanceEstimator, GeoLocation, PlaceResult, PlaceSource, SearchFilters, TransportMode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::fallback::first_success;
use super::recent_searches::RecentSearches;
use crate::ports::{
    CachePort, CachePortExt, PlaceSearchPort, PlaceSearchRequest, cache_key, namespace,
};

/// Search orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-provider timeout in milliseconds
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Live cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Oldest durable result set served when every provider fails
    #[serde(default = "default_durable_max_age_secs")]
    pub durable_max_age_secs: u64,

    /// Size of the recent-search history
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Decimals kept from the origin in cache keys (3 is about 100 m)
    #[serde(default = "default_origin_key_decimals")]
    pub origin_key_decimals: usize,
}

const fn default_provider_timeout_ms() -> u64 {
    3000
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

const fn default_durable_max_age_secs() -> u64 {
    24 * 60 * 60
}

const fn default_history_size() -> usize {
    super::recent_searches::DEFAULT_HISTORY_SIZE
}

const fn default_origin_key_decimals() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_provider_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            durable_max_age_secs: default_durable_max_age_secs(),
            history_size: default_history_size(),
            origin_key_decimals: default_origin_key_decimals(),
        }
    }
}

impl SearchConfig {
    /// Short timeouts for tests
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            provider_timeout_ms: 200,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.provider_timeout_ms == 0 || self.provider_timeout_ms > 3000 {
            return Err("provider_timeout_ms must be between 1 and 3000".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0".to_string());
        }
        if self.origin_key_decimals > 8 {
            return Err("origin_key_decimals must be 8 or less".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[must_use]
    pub const fn durable_max_age(&self) -> Duration {
        Duration::from_secs(self.durable_max_age_secs)
    }
}

/// How a search outcome was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// A backend answered
    Fresh,
    /// Served from the live cache
    Cached,
    /// Every backend failed; served from the durable store
    Offline,
    /// Every backend failed and nothing durable was found
    Unavailable,
    /// A newer search was issued while this one was in flight
    Superseded,
}

/// Result of one `search` call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub generation: u64,
    pub query: String,
    pub results: Vec<PlaceResult>,
    pub status: SearchStatus,
    /// Name of the backend that answered, for `Fresh` outcomes
    pub provider: Option<String>,
}

impl SearchOutcome {
    /// True when no source could answer
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.status == SearchStatus::Unavailable
    }
}

/// Resolves queries against an ordered list of search backends
pub struct SearchOrchestrator {
    cache: Arc<dyn CachePort>,
    providers: Vec<Arc<dyn PlaceSearchPort>>,
    config: SearchConfig,
    history: Mutex<RecentSearches>,
    latest_generation: AtomicU64,
    published: watch::Sender<Option<Arc<SearchOutcome>>>,
}

impl fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("SearchOrchestrator")
            .field("providers", &names)
            .field("config", &self.config)
            .field("generation", &self.latest_generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SearchOrchestrator {
    /// Create an orchestrator; `providers` are tried in order (primary first)
    pub fn new(
        cache: Arc<dyn CachePort>,
        providers: Vec<Arc<dyn PlaceSearchPort>>,
        config: SearchConfig,
    ) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            cache,
            providers,
            history: Mutex::new(RecentSearches::new(config.history_size)),
            config,
            latest_generation: AtomicU64::new(0),
            published,
        }
    }

    /// Watch the latest published outcome
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<SearchOutcome>>> {
        self.published.subscribe()
    }

    /// Latest published outcome, if any
    pub fn latest(&self) -> Option<Arc<SearchOutcome>> {
        self.published.borrow().clone()
    }

    /// Recent queries, most recent first
    pub fn recent_searches(&self) -> Vec<String> {
        self.history.lock().entries()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Search places around `origin`
    #[instrument(skip(self, filters), fields(generation))]
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        origin: GeoLocation,
    ) -> SearchOutcome {
        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("generation", generation);

        let key = self.cache_key(query, filters, &origin);

        let (results, status, provider) = match self.read_cache(&key).await {
            Some(cached) => {
                debug!(count = cached.len(), "Search cache hit");
                (cached, SearchStatus::Cached, None)
            },
            None => self.fetch(query, filters, origin, &key).await,
        };

        self.finish(SearchOutcome {
            generation,
            query: query.to_string(),
            results,
            status,
            provider,
        })
    }

    fn cache_key(&self, query: &str, filters: &SearchFilters, origin: &GeoLocation) -> String {
        let normalized = query.trim().to_lowercase();
        cache_key(
            namespace::SEARCH,
            &[
                &normalized,
                &filters.key_fragment(),
                &origin.key_fragment(self.config.origin_key_decimals),
            ],
        )
    }

    async fn read_cache(&self, key: &str) -> Option<Vec<PlaceResult>> {
        match self.cache.get::<Vec<PlaceResult>>(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "Search cache read failed");
                None
            },
        }
    }

    async fn fetch(
        &self,
        query: &str,
        filters: &SearchFilters,
        origin: GeoLocation,
        key: &str,
    ) -> (Vec<PlaceResult>, SearchStatus, Option<String>) {
        let request = PlaceSearchRequest {
            query: query.to_string(),
            filters: filters.clone(),
            origin,
        };
        let request = &request;

        let fallback = first_success(
            &self.providers,
            self.config.provider_timeout(),
            |results: &Vec<PlaceResult>| !results.is_empty(),
            |provider| {
                let provider = Arc::clone(provider);
                async move { provider.search(request).await }
            },
        )
        .await;

        for failure in &fallback.failures {
            warn!(
                provider = self.provider_name(failure.index),
                error = %failure.error,
                "Search provider failed"
            );
        }

        if let Some((index, raw)) = fallback.success {
            let results = refine(raw, filters, &origin);
            self.store(key, &results).await;
            return (
                results,
                SearchStatus::Fresh,
                Some(self.provider_name(index).to_string()),
            );
        }

        match self
            .cache
            .get_durable::<Vec<PlaceResult>>(key, self.config.durable_max_age())
            .await
        {
            Ok(Some(stored)) => {
                info!(count = stored.len(), "Serving search results from durable store");
                let results = stored
                    .into_iter()
                    .map(|r| r.with_source(PlaceSource::Offline))
                    .collect();
                (results, SearchStatus::Offline, None)
            },
            Ok(None) => {
                warn!("Search unavailable: every provider failed");
                (Vec::new(), SearchStatus::Unavailable, None)
            },
            Err(e) => {
                warn!(error = %e, "Durable search lookup failed");
                (Vec::new(), SearchStatus::Unavailable, None)
            },
        }
    }

    #[allow(clippy::ptr_arg)]
    async fn store(&self, key: &str, results: &Vec<PlaceResult>) {
        if let Err(e) = self.cache.set(key, results, self.config.cache_ttl()).await {
            warn!(error = %e, "Failed to cache search results");
        }
    }

    fn provider_name(&self, index: usize) -> &str {
        self.providers.get(index).map_or("unknown", |p| p.name())
    }

    fn finish(&self, mut outcome: SearchOutcome) -> SearchOutcome {
        let generation = outcome.generation;
        if generation != self.latest_generation.load(Ordering::SeqCst) {
            debug!(generation, "Search superseded by a newer call");
            outcome.status = SearchStatus::Superseded;
            return outcome;
        }

        if outcome.status != SearchStatus::Unavailable {
            self.history.lock().record(&outcome.query);
        }

        let shared = Arc::new(outcome.clone());
        self.published.send_if_modified(|current| {
            let newer = current.as_ref().is_none_or(|c| c.generation < generation);
            if newer {
                *current = Some(shared);
            }
            newer
        });

        outcome
    }
}

/// Enrich, filter, truncate and sort raw backend results
///
/// Filters run in a fixed order: category, distance, duration, then the
/// result count. Sorting is by distance with the name as tie-breaker.
#[must_use]
pub fn refine(
    raw: Vec<PlaceResult>,
    filters: &SearchFilters,
    origin: &GeoLocation,
) -> Vec<PlaceResult> {
    let mode = filters.transport_mode;
    let radius = filters.radius_meters();
    let max_duration = filters.max_duration_seconds();
    let mut seen = HashSet::new();

    let mut results: Vec<PlaceResult> = raw
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .map(|r| enrich(r, origin, mode))
        .filter(|r| filters.matches_category(&r.category))
        .filter(|r| radius.is_none_or(|max| r.distance_meters.is_some_and(|d| d <= max)))
        .filter(|r| max_duration.is_none_or(|max| r.duration_seconds.is_some_and(|d| d <= max)))
        .take(filters.results_count)
        .collect();

    results.sort_by(|a, b| {
        a.sort_distance()
            .total_cmp(&b.sort_distance())
            .then_with(|| a.name.cmp(&b.name))
    });
    results
}

/// Lowercase the category, fill in missing distance and a duration for the
/// requested mode
fn enrich(mut result: PlaceResult, origin: &GeoLocation, mode: TransportMode) -> PlaceResult {
    result.category = result.category.trim().to_lowercase();

    let distance = result
        .distance_meters
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or_else(|| DistanceEstimator::estimate(origin, &result.coordinates));
    result.distance_meters = Some(distance);

    let duration_usable = result.transport_mode == Some(mode)
        && result.duration_seconds.is_some_and(|d| d.is_finite() && d >= 0.0);
    if !duration_usable {
        result.duration_seconds = Some(DistanceEstimator::estimate_duration(distance, mode));
        result.transport_mode = Some(mode);
    }
    result
}
