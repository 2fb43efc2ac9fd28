//! Place search adapter - Implements PlaceSearchPort using the primary search API

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::{PlaceSearchPort, PlaceSearchRequest};
use async_trait::async_trait;
use domain::PlaceResult;
use integration_mapping::{
    HttpPlaceSearchClient, MappingConfig, PlaceSearchClient, PlaceSearchParams,
};
use tracing::{debug, instrument};

use super::map_mapping_error;

/// Adapter for the primary place search backend
pub struct PlaceSearchAdapter {
    client: Arc<dyn PlaceSearchClient>,
}

impl std::fmt::Debug for PlaceSearchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceSearchAdapter")
            .field("client", &"PlaceSearchClient")
            .finish()
    }
}

impl PlaceSearchAdapter {
    /// Create an adapter backed by the HTTP search client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: &MappingConfig) -> Result<Self, ApplicationError> {
        let client = HttpPlaceSearchClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Create an adapter around any search client
    #[must_use]
    pub fn with_client(client: Arc<dyn PlaceSearchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlaceSearchPort for PlaceSearchAdapter {
    fn name(&self) -> &str {
        "primary"
    }

    #[instrument(skip(self, request), fields(query = %request.query, mode = %request.filters.transport_mode))]
    async fn search(
        &self,
        request: &PlaceSearchRequest,
    ) -> Result<Vec<PlaceResult>, ApplicationError> {
        let params = PlaceSearchParams {
            query: &request.query,
            origin: request.origin,
            mode: request.filters.transport_mode,
            category: request.filters.category.as_deref(),
            limit: request.filters.results_count,
        };

        let result = self.client.search(&params).await.map_err(map_mapping_error);
        match &result {
            Ok(places) => debug!(count = places.len(), "Primary search answered"),
            Err(e) => debug!(error = %e, "Primary search failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use domain::{GeoLocation, PlaceSource, SearchFilters, TransportMode};
    use integration_mapping::MappingError;
    use parking_lot::Mutex;

    use super::*;

    /// Records the parameters it was called with
    #[derive(Debug, Default)]
    struct RecordingClient {
        seen: Mutex<Vec<(String, TransportMode, Option<String>, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl PlaceSearchClient for RecordingClient {
        async fn search(
            &self,
            params: &PlaceSearchParams<'_>,
        ) -> Result<Vec<PlaceResult>, MappingError> {
            self.seen.lock().push((
                params.query.to_string(),
                params.mode,
                params.category.map(str::to_string),
                params.limit,
            ));
            if self.fail {
                return Err(MappingError::RequestFailed("HTTP 503".to_string()));
            }
            Ok(vec![PlaceResult::new(
                "1",
                "Le Procope",
                params.origin,
                "restaurants",
                PlaceSource::Primary,
            )])
        }
    }

    fn request() -> PlaceSearchRequest {
        PlaceSearchRequest {
            query: "bistro".to_string(),
            filters: SearchFilters {
                category: Some("restaurants".to_string()),
                transport_mode: TransportMode::Walking,
                results_count: 5,
                ..Default::default()
            },
            origin: GeoLocation::new(48.8566, 2.3522).unwrap(),
        }
    }

    #[tokio::test]
    async fn filters_become_request_parameters() {
        let client = Arc::new(RecordingClient::default());
        let adapter = PlaceSearchAdapter::with_client(client.clone());

        let places = adapter.search(&request()).await.unwrap();

        assert_eq!(places.len(), 1);
        assert_eq!(
            client.seen.lock().as_slice(),
            &[(
                "bistro".to_string(),
                TransportMode::Walking,
                Some("restaurants".to_string()),
                5
            )]
        );
    }

    #[tokio::test]
    async fn backend_errors_are_external_service_errors() {
        let adapter = PlaceSearchAdapter::with_client(Arc::new(RecordingClient {
            fail: true,
            ..Default::default()
        }));

        let err = adapter.search(&request()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ExternalService(_)));
        assert_eq!(adapter.name(), "primary");
    }
}
