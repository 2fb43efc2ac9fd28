//! Device geolocation port

use async_trait::async_trait;
use domain::GeoLocation;
#[cfg(test)]
use mockall::automock;

use crate::error::GeolocationError;

/// Port for reading the device's current position
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GeolocationPort: Send + Sync {
    async fn current_position(&self) -> Result<GeoLocation, GeolocationError>;
}
