//! Service wiring
//!
//! Builds the cache, the mapping adapters and every application service from
//! an [`AppConfig`]. All dependencies are passed explicitly; nothing here is
//! global.

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::{
    CachePort, ChannelTransport, Clock, DirectionsPort, GeolocationPort, MapViewPort,
    PlaceSearchPort, SystemClock,
};
use application::{
    LocationResolver, MapReconciler, NavigationSession, RealtimeChannel, RouteProvider,
    SearchOrchestrator,
};
use tracing::{info, instrument, warn};

use crate::adapters::{
    ConfiguredGeolocation, DirectionsAdapter, GeocodingAdapter, PlaceSearchAdapter,
    WebSocketTransport,
};
use crate::cache::{GeoCache, MokaCache, RedbCache};
use crate::config::AppConfig;

/// Every service of the core, ready to use
pub struct CoreServices {
    pub cache: Arc<GeoCache>,
    pub search: Arc<SearchOrchestrator>,
    pub routes: Arc<RouteProvider>,
    pub realtime: Arc<RealtimeChannel>,
    pub map: Arc<MapReconciler>,
    pub navigation: Arc<NavigationSession>,
    pub location: Arc<LocationResolver>,
}

impl std::fmt::Debug for CoreServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreServices")
            .field("cache", &self.cache)
            .field("routes", &self.routes)
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}

impl CoreServices {
    /// Build all services with the system clock
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config is invalid, the durable
    /// cache cannot be opened or an HTTP client cannot be created.
    pub async fn build(
        config: &AppConfig,
        map_view: Arc<dyn MapViewPort>,
    ) -> Result<Self, ApplicationError> {
        Self::build_with_clock(config, map_view, Arc::new(SystemClock)).await
    }

    /// Build all services around an explicit clock
    ///
    /// # Errors
    ///
    /// See [`CoreServices::build`].
    #[instrument(skip_all)]
    pub async fn build_with_clock(
        config: &AppConfig,
        map_view: Arc<dyn MapViewPort>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApplicationError> {
        config.validate().map_err(ApplicationError::Configuration)?;
        let default_origin = config
            .default_origin()
            .map_err(ApplicationError::Configuration)?;

        let cache = Arc::new(Self::build_cache(config, &clock).await?);
        let cache_port: Arc<dyn CachePort> = cache.clone();

        let providers: Vec<Arc<dyn PlaceSearchPort>> = vec![
            Arc::new(PlaceSearchAdapter::new(&config.mapping)?),
            Arc::new(GeocodingAdapter::new(&config.mapping)?),
        ];
        let search = Arc::new(SearchOrchestrator::new(
            Arc::clone(&cache_port),
            providers,
            config.search.clone(),
        ));

        let directions: Arc<dyn DirectionsPort> =
            Arc::new(DirectionsAdapter::new(&config.mapping)?);
        let routes = Arc::new(RouteProvider::new(
            directions,
            Arc::clone(&cache_port),
            config.routing.clone(),
        ));

        let transport: Arc<dyn ChannelTransport> =
            Arc::new(WebSocketTransport::new(config.realtime.url.clone()));
        let realtime = Arc::new(RealtimeChannel::new(transport, config.realtime.clone()));

        let map = Arc::new(MapReconciler::new(map_view, config.map.clone()));

        let navigation = Arc::new(NavigationSession::new(
            Arc::clone(&routes),
            clock,
            config.navigation.clone(),
        ));

        let device_position = config
            .device_location
            .and_then(|location| location.to_geo_location());
        let geolocation: Arc<dyn GeolocationPort> =
            Arc::new(ConfiguredGeolocation::new(device_position));
        let location = Arc::new(LocationResolver::new(geolocation, default_origin));

        info!(
            search_url = %config.mapping.search_base_url,
            directions_url = %config.mapping.directions_base_url,
            realtime = config.realtime.url.is_some(),
            durable = config.cache.durable_path.is_some(),
            "Core services ready"
        );

        Ok(Self {
            cache,
            search,
            routes,
            realtime,
            map,
            navigation,
            location,
        })
    }

    /// Open both cache layers and drop durable entries past retention
    async fn build_cache(
        config: &AppConfig,
        clock: &Arc<dyn Clock>,
    ) -> Result<GeoCache, ApplicationError> {
        let live = MokaCache::with_clock(config.cache.max_live_entries, Arc::clone(clock));
        let durable = match &config.cache.durable_path {
            Some(path) => RedbCache::open(path, Arc::clone(clock))?,
            None => RedbCache::in_memory(Arc::clone(clock))?,
        };

        match durable.prune(config.cache.retention()).await {
            Ok(0) => {},
            Ok(pruned) => info!(pruned, "Pruned stale durable cache entries"),
            Err(e) => warn!(error = %e, "Durable cache pruning failed"),
        }

        Ok(GeoCache::new(live, durable))
    }
}
