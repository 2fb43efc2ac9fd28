//! Application configuration
//!
//! One struct per concern, each with serde defaults and `validate()`.
//! `AppConfig::load` reads an optional `config.toml` and applies
//! `WAYFINDER_*` environment overrides, using `__` between nested keys
//! (e.g. `WAYFINDER_SEARCH__PROVIDER_TIMEOUT_MS=2000`).

mod cache;

use std::path::Path;

use application::{
    NavigationConfig, RealtimeConfig, ReconcilerConfig, RoutingConfig, SearchConfig,
};
use domain::GeoLocation;
use integration_mapping::MappingConfig;
use serde::{Deserialize, Serialize};

pub use cache::CacheConfig;

use crate::telemetry::TelemetryConfig;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "WAYFINDER";

/// Geographic location configuration (latitude/longitude pair)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocationConfig {
    /// Latitude (-90.0 to 90.0)
    pub latitude: f64,
    /// Longitude (-180.0 to 180.0)
    pub longitude: f64,
}

impl GeoLocationConfig {
    /// Convert to domain `GeoLocation` value object
    ///
    /// Returns `None` if coordinates are invalid.
    #[must_use]
    pub fn to_geo_location(&self) -> Option<GeoLocation> {
        GeoLocation::new(self.latitude, self.longitude).ok()
    }
}

/// Paris, used when no position is available
fn default_origin() -> GeoLocationConfig {
    GeoLocationConfig {
        latitude: 48.8566,
        longitude: 2.3522,
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub map: ReconcilerConfig,

    /// Mapping backends (search, geocoding, directions)
    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Search origin when the device position is unknown
    #[serde(default = "default_origin")]
    pub default_origin: GeoLocationConfig,

    /// Fixed device position, if the host knows one
    #[serde(default)]
    pub device_location: Option<GeoLocationConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            routing: RoutingConfig::default(),
            realtime: RealtimeConfig::default(),
            navigation: NavigationConfig::default(),
            map: ReconcilerConfig::default(),
            mapping: MappingConfig::default(),
            cache: CacheConfig::default(),
            telemetry: TelemetryConfig::default(),
            default_origin: default_origin(),
            device_location: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(config::File::with_name("config").required(false))
    }

    /// Load configuration from an explicit file plus the environment
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::build(config::File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Configuration pointing every backend at `base_url`, with fast timers
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            search: SearchConfig::for_testing(),
            routing: RoutingConfig::for_testing(),
            realtime: RealtimeConfig::for_testing(),
            navigation: NavigationConfig::for_testing(),
            map: ReconcilerConfig::for_testing(),
            mapping: MappingConfig::for_testing(base_url),
            cache: CacheConfig::for_testing(),
            telemetry: TelemetryConfig::default(),
            default_origin: default_origin(),
            device_location: None,
        }
    }

    /// The default origin as a domain value
    ///
    /// # Errors
    ///
    /// Returns an error if the configured coordinates are out of range.
    pub fn default_origin(&self) -> Result<GeoLocation, String> {
        self.default_origin
            .to_geo_location()
            .ok_or_else(|| "default_origin has invalid coordinates".to_string())
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first problem found, prefixed with its section name.
    pub fn validate(&self) -> Result<(), String> {
        let section = |name: &str, result: Result<(), String>| {
            result.map_err(|e| format!("{name}: {e}"))
        };

        section("search", self.search.validate())?;
        section("routing", self.routing.validate())?;
        section("realtime", self.realtime.validate())?;
        section("navigation", self.navigation.validate())?;
        section("map", self.map.validate())?;
        section("mapping", self.mapping.validate())?;
        section("cache", self.cache.validate())?;
        self.default_origin()?;
        if self
            .device_location
            .is_some_and(|location| location.to_geo_location().is_none())
        {
            return Err("device_location has invalid coordinates".to_string());
        }
        Ok(())
    }
}
