//! Geolocation adapter backed by configuration
//!
//! Headless hosts have no positioning hardware; they either know where the
//! device is (a fixed position in the config) or report it as unavailable,
//! which makes the location resolver use the default origin.

use application::error::GeolocationError;
use application::ports::GeolocationPort;
use async_trait::async_trait;
use domain::GeoLocation;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredGeolocation {
    position: Option<GeoLocation>,
}

impl ConfiguredGeolocation {
    #[must_use]
    pub const fn new(position: Option<GeoLocation>) -> Self {
        Self { position }
    }

    /// A device without any position source
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { position: None }
    }
}

#[async_trait]
impl GeolocationPort for ConfiguredGeolocation {
    async fn current_position(&self) -> Result<GeoLocation, GeolocationError> {
        self.position.ok_or_else(|| {
            debug!("No configured device position");
            GeolocationError::PositionUnavailable
        })
    }
}
