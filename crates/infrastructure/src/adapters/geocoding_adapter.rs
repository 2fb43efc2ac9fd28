//! Geocoding adapter - the secondary search source
//!
//! Resolves free-text queries to points of interest near the search origin.
//! Used when the primary search backend fails or answers with nothing.

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::{PlaceSearchPort, PlaceSearchRequest};
use async_trait::async_trait;
use domain::PlaceResult;
use integration_mapping::{GeocodingClient, HttpGeocodingClient, MappingConfig};
use tracing::{debug, instrument};

use super::map_mapping_error;

pub struct GeocodingAdapter {
    client: Arc<dyn GeocodingClient>,
}

impl std::fmt::Debug for GeocodingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodingAdapter")
            .field("client", &"GeocodingClient")
            .finish()
    }
}

impl GeocodingAdapter {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: &MappingConfig) -> Result<Self, ApplicationError> {
        let client = HttpGeocodingClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_client(Arc::new(client)))
    }

    #[must_use]
    pub fn with_client(client: Arc<dyn GeocodingClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlaceSearchPort for GeocodingAdapter {
    fn name(&self) -> &str {
        "geocoder"
    }

    #[instrument(skip(self, request), fields(query = %request.query))]
    async fn search(
        &self,
        request: &PlaceSearchRequest,
    ) -> Result<Vec<PlaceResult>, ApplicationError> {
        let places = self
            .client
            .geocode(
                &request.query,
                Some(request.origin),
                request.filters.results_count,
            )
            .await
            .map_err(map_mapping_error)?;

        debug!(count = places.len(), "Geocoder answered");
        Ok(places)
    }
}
