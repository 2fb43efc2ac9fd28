//! Route computation with caching and graceful degradation
//!
//! `try_route` is the strict path: live cache, then the directions backend
//! under a hard timeout. `route` never fails: when the backend is unavailable
//! or finds nothing it serves the durable copy, and failing that a
//! straight-line route flagged `degraded`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use domain::{GeoLocation, Route, RouteQuery, TransportMode};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::RoutingError;
use crate::ports::{CachePort, CachePortExt, DirectionsPort, cache_key, namespace};

/// Which alternative to keep when the backend offers several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteSelection {
    /// Shortest duration
    #[default]
    Fastest,
    /// Shortest distance
    Shortest,
}

impl RouteSelection {
    fn pick(self, routes: Vec<Route>) -> Option<Route> {
        routes.into_iter().min_by(|a, b| match self {
            Self::Fastest => a.duration_seconds.total_cmp(&b.duration_seconds),
            Self::Shortest => a.distance_meters.total_cmp(&b.distance_meters),
        })
    }
}

/// Routing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Hard timeout for one directions call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Live cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Oldest durable route served when the backend is unavailable
    #[serde(default = "default_durable_max_age_secs")]
    pub durable_max_age_secs: u64,

    #[serde(default)]
    pub selection: RouteSelection,
}

const fn default_timeout_ms() -> u64 {
    3000
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

const fn default_durable_max_age_secs() -> u64 {
    24 * 60 * 60
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            durable_max_age_secs: default_durable_max_age_secs(),
            selection: RouteSelection::default(),
        }
    }
}

impl RoutingConfig {
    /// Short timeout for tests
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_ms: 200,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Counters for where routes came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub live: u64,
    pub cached: u64,
    pub durable: u64,
    pub degraded: u64,
}

#[derive(Debug, Default)]
struct RouteCounters {
    live: AtomicU64,
    cached: AtomicU64,
    durable: AtomicU64,
    degraded: AtomicU64,
}

/// Computes routes for any transport mode
pub struct RouteProvider {
    directions: Arc<dyn DirectionsPort>,
    cache: Arc<dyn CachePort>,
    config: RoutingConfig,
    counters: RouteCounters,
}

impl std::fmt::Debug for RouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteProvider")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl RouteProvider {
    pub fn new(
        directions: Arc<dyn DirectionsPort>,
        cache: Arc<dyn CachePort>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            directions,
            cache,
            config,
            counters: RouteCounters::default(),
        }
    }

    /// Route statistics since construction
    pub fn stats(&self) -> RouteStats {
        RouteStats {
            live: self.counters.live.load(Ordering::Relaxed),
            cached: self.counters.cached.load(Ordering::Relaxed),
            durable: self.counters.durable.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    /// Compute a route, failing instead of degrading
    #[instrument(skip(self, query), fields(mode = %query.transport_mode))]
    pub async fn try_route(&self, query: &RouteQuery) -> Result<Arc<Route>, RoutingError> {
        query
            .validate()
            .map_err(|e| RoutingError::InvalidQuery(e.to_string()))?;

        let key = Self::cache_key(query);
        match self.cache.get::<Route>(&key).await {
            Ok(Some(route)) => {
                debug!("Route cache hit");
                self.counters.cached.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::new(route));
            },
            Ok(None) => {},
            Err(e) => warn!(error = %e, "Route cache read failed"),
        }

        let routes = tokio::time::timeout(self.config.timeout(), self.directions.directions(query))
            .await
            .map_err(|_| {
                RoutingError::ProviderUnavailable(format!(
                    "timed out after {} ms",
                    self.config.timeout_ms
                ))
            })?
            .map_err(|e| RoutingError::ProviderUnavailable(e.to_string()))?;

        let alternatives = routes.len();
        let mut route = self
            .config
            .selection
            .pick(routes)
            .ok_or(RoutingError::NoRouteFound)?;
        route.degraded = false;
        route.transport_mode = query.transport_mode;
        debug!(alternatives, distance = route.distance_meters, "Route computed");

        let ttl = Duration::from_secs(self.config.cache_ttl_secs);
        if let Err(e) = self.cache.set(&key, &route, ttl).await {
            warn!(error = %e, "Failed to cache route");
        }
        self.counters.live.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(route))
    }

    /// Compute a route, degrading instead of failing
    ///
    /// Fallback order is live, durable copy, straight-line estimate.
    /// Degraded routes are never cached.
    pub async fn route(&self, query: &RouteQuery) -> Arc<Route> {
        match self.try_route(query).await {
            Ok(route) => route,
            Err(RoutingError::InvalidQuery(reason)) => {
                debug!(%reason, "Invalid route query, degrading");
                self.degraded(query)
            },
            Err(error) => {
                warn!(%error, mode = %query.transport_mode, "Routing failed, falling back");
                if let Some(route) = self.durable(query).await {
                    return route;
                }
                self.degraded(query)
            },
        }
    }

    /// Compute every mode concurrently; failing modes degrade individually
    pub async fn route_all_modes(
        &self,
        origin: GeoLocation,
        destination: GeoLocation,
        modes: &[TransportMode],
    ) -> HashMap<TransportMode, Arc<Route>> {
        let base = RouteQuery::new(origin, destination, TransportMode::default());
        let tasks = modes.iter().map(|mode| {
            let query = base.for_mode(*mode);
            async move { (query.transport_mode, self.route(&query).await) }
        });
        join_all(tasks).await.into_iter().collect()
    }

    fn cache_key(query: &RouteQuery) -> String {
        cache_key(namespace::ROUTE, &[&query.key_fragment()])
    }

    async fn durable(&self, query: &RouteQuery) -> Option<Arc<Route>> {
        let max_age = Duration::from_secs(self.config.durable_max_age_secs);
        match self
            .cache
            .get_durable::<Route>(&Self::cache_key(query), max_age)
            .await
        {
            Ok(Some(route)) => {
                info!(mode = %query.transport_mode, "Serving durable route");
                self.counters.durable.fetch_add(1, Ordering::Relaxed);
                Some(Arc::new(route))
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Durable route lookup failed");
                None
            },
        }
    }

    fn degraded(&self, query: &RouteQuery) -> Arc<Route> {
        self.counters.degraded.fetch_add(1, Ordering::Relaxed);
        Arc::new(Route::straight_line(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApplicationError;
    use crate::ports::MockDirectionsPort;
    use crate::services::test_support::MemoryCache;
    use domain::{DistanceEstimator, Maneuver, Step};

    fn query(mode: TransportMode) -> RouteQuery {
        let origin = GeoLocation::paris();
        RouteQuery::new(origin, origin.offset(3_000.0, 30.0), mode)
    }

    fn backend_route(distance: f64, duration: f64) -> Route {
        Route {
            distance_meters: distance,
            duration_seconds: duration,
            geometry: vec![[2.3522, 48.8566], [2.36, 48.86], [2.37, 48.87]],
            legs: vec![Step {
                instruction: "Head north".to_string(),
                distance_meters: distance,
                duration_seconds: duration,
                maneuver: Maneuver::Depart,
            }],
            transport_mode: TransportMode::Driving,
            degraded: false,
        }
    }

    fn provider(directions: MockDirectionsPort) -> (RouteProvider, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::default());
        let provider = RouteProvider::new(
            Arc::new(directions),
            Arc::clone(&cache) as Arc<dyn CachePort>,
            RoutingConfig::default(),
        );
        (provider, cache)
    }

    #[tokio::test]
    async fn zero_routes_degrade_to_straight_line() {
        let mut directions = MockDirectionsPort::new();
        directions.expect_directions().returning(|_| Ok(vec![]));
        let (provider, cache) = provider(directions);
        let q = query(TransportMode::Driving);

        assert_eq!(provider.try_route(&q).await, Err(RoutingError::NoRouteFound));

        let route = provider.route(&q).await;
        assert!(route.degraded);
        assert_eq!(route.geometry.len(), 2);
        let expected = DistanceEstimator::estimate(&q.origin, &q.destination);
        assert!((route.distance_meters - expected).abs() < 1e-6);
        assert!(cache.live_keys().is_empty(), "degraded routes are not cached");
    }

    #[tokio::test]
    async fn network_error_degrades() {
        let mut directions = MockDirectionsPort::new();
        directions
            .expect_directions()
            .returning(|_| Err(ApplicationError::ExternalService("502".to_string())));
        let (provider, _) = provider(directions);

        let route = provider.route(&query(TransportMode::Walking)).await;
        assert!(route.degraded);
        assert_eq!(route.transport_mode, TransportMode::Walking);
        assert_eq!(provider.stats().degraded, 1);
    }

    #[tokio::test]
    async fn durable_copy_beats_straight_line() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let mut directions = MockDirectionsPort::new();
        directions.expect_directions().returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![backend_route(4_000.0, 600.0)])
            } else {
                Err(ApplicationError::ExternalService("offline".to_string()))
            }
        });
        let (provider, cache) = provider(directions);
        let q = query(TransportMode::Driving);

        provider.route(&q).await;
        cache.clear_live();
        let route = provider.route(&q).await;

        assert!(!route.degraded);
        assert!((route.distance_meters - 4_000.0).abs() < f64::EPSILON);
        assert_eq!(provider.stats().durable, 1);
    }

    #[tokio::test]
    async fn cached_route_skips_network() {
        let mut directions = MockDirectionsPort::new();
        directions
            .expect_directions()
            .times(1)
            .returning(|_| Ok(vec![backend_route(4_000.0, 600.0)]));
        let (provider, _) = provider(directions);
        let q = query(TransportMode::Driving);

        let first = provider.try_route(&q).await.unwrap();
        let second = provider.try_route(&q).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.stats(), RouteStats { live: 1, cached: 1, durable: 0, degraded: 0 });
    }

    #[tokio::test]
    async fn modes_are_cached_independently() {
        let mut directions = MockDirectionsPort::new();
        directions
            .expect_directions()
            .times(2)
            .returning(|_| Ok(vec![backend_route(4_000.0, 600.0)]));
        let (provider, _) = provider(directions);

        provider.try_route(&query(TransportMode::Driving)).await.unwrap();
        let walking = provider.try_route(&query(TransportMode::Walking)).await.unwrap();
        assert_eq!(walking.transport_mode, TransportMode::Walking);
    }

    #[tokio::test]
    async fn selects_alternative_by_policy() {
        let mut directions = MockDirectionsPort::new();
        directions.expect_directions().returning(|_| {
            Ok(vec![
                backend_route(5_000.0, 400.0),
                backend_route(3_000.0, 700.0),
            ])
        });
        let (fastest, _) = provider(directions);
        let route = fastest.try_route(&query(TransportMode::Driving)).await.unwrap();
        assert!((route.duration_seconds - 400.0).abs() < f64::EPSILON);

        let mut directions = MockDirectionsPort::new();
        directions.expect_directions().returning(|_| {
            Ok(vec![
                backend_route(5_000.0, 400.0),
                backend_route(3_000.0, 700.0),
            ])
        });
        let shortest = RouteProvider::new(
            Arc::new(directions),
            Arc::new(MemoryCache::default()),
            RoutingConfig {
                selection: RouteSelection::Shortest,
                ..Default::default()
            },
        );
        let route = shortest.try_route(&query(TransportMode::Driving)).await.unwrap();
        assert!((route.distance_meters - 3_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn invalid_query_is_rejected_strictly_and_degrades_leniently() {
        let directions = MockDirectionsPort::new();
        let (provider, _) = provider(directions);
        let p = GeoLocation::paris();
        let q = RouteQuery::new(p, p, TransportMode::Cycling);

        assert!(matches!(
            provider.try_route(&q).await,
            Err(RoutingError::InvalidQuery(_))
        ));
        let route = provider.route(&q).await;
        assert!(route.degraded);
        assert!(route.distance_meters.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn all_modes_returns_partial_results() {
        let mut directions = MockDirectionsPort::new();
        directions.expect_directions().returning(|q| {
            if q.transport_mode == TransportMode::Transit {
                Err(ApplicationError::ExternalService("no transit".to_string()))
            } else {
                Ok(vec![backend_route(4_000.0, 600.0)])
            }
        });
        let (provider, _) = provider(directions);
        let q = query(TransportMode::Driving);
        let modes = [TransportMode::Driving, TransportMode::Walking, TransportMode::Transit];

        let routes = provider.route_all_modes(q.origin, q.destination, &modes).await;

        assert_eq!(routes.len(), 3);
        assert!(!routes[&TransportMode::Driving].degraded);
        assert!(!routes[&TransportMode::Walking].degraded);
        assert!(routes[&TransportMode::Transit].degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        #[derive(Debug)]
        struct Hanging;

        #[async_trait::async_trait]
        impl DirectionsPort for Hanging {
            async fn directions(&self, _: &RouteQuery) -> Result<Vec<Route>, ApplicationError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(vec![])
            }
        }

        let provider = RouteProvider::new(
            Arc::new(Hanging),
            Arc::new(MemoryCache::default()),
            RoutingConfig::default(),
        );
        let q = query(TransportMode::Driving);

        assert!(matches!(
            provider.try_route(&q).await,
            Err(RoutingError::ProviderUnavailable(_))
        ));
        assert!(provider.route(&q).await.degraded);
    }

    #[test]
    fn config_validation() {
        assert!(RoutingConfig::default().validate().is_ok());
        assert!(RoutingConfig::for_testing().validate().is_ok());
        let zero = RoutingConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
