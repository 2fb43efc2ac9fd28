//! Primary place search client
//!
//! `GET /search?query&mode&lat&lon&limit&category` returning an array of
//! places with optional precomputed distance and duration.

use async_trait::async_trait;
use domain::{GeoLocation, PlaceResult, TransportMode};
use tracing::{debug, instrument, warn};

use crate::config::MappingConfig;
use crate::error::MappingError;
use crate::http::HttpCore;
use crate::models::RawSearchPlace;

/// Parameters of a primary search
#[derive(Debug, Clone)]
pub struct PlaceSearchParams<'a> {
    pub query: &'a str,
    pub origin: GeoLocation,
    pub mode: TransportMode,
    pub category: Option<&'a str>,
    pub limit: usize,
}

/// Trait for place search clients
#[async_trait]
pub trait PlaceSearchClient: Send + Sync {
    /// Search places near an origin
    async fn search(&self, params: &PlaceSearchParams<'_>)
    -> Result<Vec<PlaceResult>, MappingError>;
}

/// HTTP client for the primary search service
#[derive(Debug)]
pub struct HttpPlaceSearchClient {
    http: HttpCore,
    config: MappingConfig,
}

impl HttpPlaceSearchClient {
    /// Create a new search client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &MappingConfig) -> Result<Self, MappingError> {
        Ok(Self {
            http: HttpCore::new(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl PlaceSearchClient for HttpPlaceSearchClient {
    #[instrument(skip(self, params), fields(query = %params.query, mode = %params.mode))]
    async fn search(
        &self,
        params: &PlaceSearchParams<'_>,
    ) -> Result<Vec<PlaceResult>, MappingError> {
        let query = params.query.trim();
        if query.is_empty() {
            return Err(MappingError::InvalidQuery(
                "Search query must not be empty".to_string(),
            ));
        }

        let url = format!("{}/search", self.config.search_base_url);
        let limit = params.limit.clamp(1, usize::from(self.config.max_results));
        let mut query_params = vec![
            ("query", query.to_string()),
            ("mode", params.mode.profile().to_string()),
            ("lat", params.origin.latitude().to_string()),
            ("lon", params.origin.longitude().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(category) = params.category.filter(|c| !c.trim().is_empty()) {
            query_params.push(("category", category.to_string()));
        }

        let raw: Vec<RawSearchPlace> = self.http.get_json(&url, &query_params).await?;
        let total = raw.len();
        let places: Vec<PlaceResult> = raw
            .into_iter()
            .filter_map(|place| place.into_place(query, params.mode))
            .collect();

        if places.len() < total {
            warn!(dropped = total - places.len(), "Dropped malformed places");
        }
        debug!(count = places.len(), "Places found");
        Ok(places)
    }
}
