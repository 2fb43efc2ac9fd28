//! Directions client
//!
//! `GET /directions/{profile}/{lon,lat;lon,lat...}` with steps, GeoJSON
//! geometry and alternatives. Every alternative the backend returns is
//! converted; choosing one is up to the caller.

use async_trait::async_trait;
use domain::{Route, RouteQuery, TransportMode};
use tracing::{debug, instrument, warn};

use crate::config::MappingConfig;
use crate::error::MappingError;
use crate::http::HttpCore;
use crate::models::RawDirectionsResponse;

/// Trait for directions clients
#[async_trait]
pub trait DirectionsClient: Send + Sync {
    /// All route alternatives for a query; an empty list means no route exists
    async fn directions(&self, query: &RouteQuery) -> Result<Vec<Route>, MappingError>;
}

/// HTTP directions client
#[derive(Debug)]
pub struct HttpDirectionsClient {
    http: HttpCore,
    config: MappingConfig,
}

impl HttpDirectionsClient {
    /// Create a new directions client
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

    fn profile(mode: TransportMode) -> Result<&'static str, MappingError> {
        match mode {
            TransportMode::Transit => Err(MappingError::UnsupportedMode(mode)),
            other => Ok(other.profile()),
        }
    }

    fn coordinates_path(query: &RouteQuery) -> String {
        query
            .points()
            .iter()
            .map(|p| format!("{},{}", p.longitude(), p.latitude()))
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[async_trait]
impl DirectionsClient for HttpDirectionsClient {
    #[instrument(skip(self, query), fields(mode = %query.transport_mode, waypoints = query.waypoints.len()))]
    async fn directions(&self, query: &RouteQuery) -> Result<Vec<Route>, MappingError> {
        query
            .validate()
            .map_err(|e| MappingError::InvalidQuery(e.to_string()))?;
        let profile = Self::profile(query.transport_mode)?;

        let url = format!(
            "{}/directions/{profile}/{}",
            self.config.directions_base_url,
            Self::coordinates_path(query)
        );
        let params = [
            ("steps", "true".to_string()),
            ("geometries", "geojson".to_string()),
            ("overview", "full".to_string()),
            ("alternatives", "true".to_string()),
            ("language", self.config.language.clone()),
        ];

        let response: RawDirectionsResponse = self.http.get_json(&url, &params).await?;

        match response.code.as_deref() {
            None | Some("Ok") => {},
            Some("NoRoute" | "NoSegment") => {
                debug!("Backend found no route");
                return Ok(Vec::new());
            },
            Some(code) => {
                let message = response.message.unwrap_or_default();
                warn!(%code, %message, "Directions request rejected");
                return Err(MappingError::RequestFailed(format!("{code}: {message}")));
            },
        }

        let routes: Vec<Route> = response
            .routes
            .into_iter()
            .map(|raw| raw.into_route(query.transport_mode))
            .collect();
        debug!(alternatives = routes.len(), "Directions received");
        Ok(routes)
    }
}
