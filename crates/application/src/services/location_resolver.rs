//! Search origin resolution

use std::sync::Arc;
use std::time::Duration;

use domain::GeoLocation;
use tracing::{debug, warn};

use crate::error::GeolocationError;
use crate::ports::GeolocationPort;

/// Upper bound for a device position lookup
const POSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the origin for searches and routes
///
/// Uses the device position when available and a fixed default otherwise.
/// A denied permission is reported to the caller instead of being hidden.
pub struct LocationResolver {
    geolocation: Arc<dyn GeolocationPort>,
    default_origin: GeoLocation,
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("default_origin", &self.default_origin)
            .finish_non_exhaustive()
    }
}

impl LocationResolver {
    pub fn new(geolocation: Arc<dyn GeolocationPort>, default_origin: GeoLocation) -> Self {
        Self {
            geolocation,
            default_origin,
        }
    }

    pub const fn default_origin(&self) -> GeoLocation {
        self.default_origin
    }

    /// Current origin
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the user refused location access.
    pub async fn resolve(&self) -> Result<GeoLocation, GeolocationError> {
        let position = tokio::time::timeout(POSITION_TIMEOUT, self.geolocation.current_position())
            .await
            .unwrap_or(Err(GeolocationError::Timeout));

        match position {
            Ok(location) => {
                debug!(%location, "Resolved device position");
                Ok(location)
            },
            Err(error) if error.is_permanent() => {
                warn!(%error, "Location permission denied");
                Err(error)
            },
            Err(error) => {
                debug!(%error, "Position unavailable, using default origin");
                Ok(self.default_origin)
            },
        }
    }
}
