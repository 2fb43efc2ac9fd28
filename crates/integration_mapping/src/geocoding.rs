//! Geocoding client used as secondary search backend

use async_trait::async_trait;
use domain::{GeoLocation, PlaceResult};
use tracing::{debug, instrument};

use crate::config::MappingConfig;
use crate::error::MappingError;
use crate::http::HttpCore;
use crate::models::RawGeocodeResponse;

/// Trait for geocoding clients
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Resolve a free-form query to points of interest, biased towards `proximity`
    async fn geocode(
        &self,
        query: &str,
        proximity: Option<GeoLocation>,
        limit: usize,
    ) -> Result<Vec<PlaceResult>, MappingError>;
}

/// HTTP geocoding client
#[derive(Debug)]
pub struct HttpGeocodingClient {
    http: HttpCore,
    config: MappingConfig,
}

impl HttpGeocodingClient {
    /// Create a new geocoding client
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
impl GeocodingClient for HttpGeocodingClient {
    #[instrument(skip(self))]
    async fn geocode(
        &self,
        query: &str,
        proximity: Option<GeoLocation>,
        limit: usize,
    ) -> Result<Vec<PlaceResult>, MappingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MappingError::InvalidQuery(
                "Geocoding query must not be empty".to_string(),
            ));
        }

        let url = format!("{}/geocode", self.config.geocoding_base_url);
        let limit = limit.clamp(1, usize::from(self.config.max_results));
        let mut params = vec![
            ("query", query.to_string()),
            ("limit", limit.to_string()),
            ("types", "poi".to_string()),
            ("language", self.config.language.clone()),
        ];
        if let Some(origin) = proximity {
            params.push((
                "proximity",
                format!("{},{}", origin.longitude(), origin.latitude()),
            ));
        }

        let response: RawGeocodeResponse = self.http.get_json(&url, &params).await?;
        let places: Vec<PlaceResult> = response
            .into_features()
            .into_iter()
            .filter_map(|feature| feature.into_place(query))
            .collect();

        debug!(count = places.len(), "Geocoded places");
        Ok(places)
    }
}
