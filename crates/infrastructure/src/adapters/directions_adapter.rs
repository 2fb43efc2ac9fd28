//! Directions adapter - Implements DirectionsPort using the directions API

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::DirectionsPort;
use async_trait::async_trait;
use domain::{Route, RouteQuery};
use integration_mapping::{DirectionsClient, HttpDirectionsClient, MappingConfig};
use tracing::{debug, instrument};

use super::map_mapping_error;

/// Adapter for turn-by-turn directions
///
/// A mode the backend has no profile for (transit) is reported as an
/// external service failure, so the route provider degrades to an estimate.
pub struct DirectionsAdapter {
    client: Arc<dyn DirectionsClient>,
}

impl std::fmt::Debug for DirectionsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectionsAdapter")
            .field("client", &"DirectionsClient")
            .finish()
    }
}

impl DirectionsAdapter {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: &MappingConfig) -> Result<Self, ApplicationError> {
        let client = HttpDirectionsClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_client(Arc::new(client)))
    }

    #[must_use]
    pub fn with_client(client: Arc<dyn DirectionsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectionsPort for DirectionsAdapter {
    #[instrument(skip(self, query), fields(mode = %query.transport_mode, waypoints = query.waypoints.len()))]
    async fn directions(&self, query: &RouteQuery) -> Result<Vec<Route>, ApplicationError> {
        let routes = self
            .client
            .directions(query)
            .await
            .map_err(map_mapping_error)?;
        debug!(alternatives = routes.len(), "Directions answered");
        Ok(routes)
    }
}
