//! Place search port
//!
//! Uniform contract for every search backend (primary search API, secondary
//! geocoder). The search orchestrator iterates an ordered list of these.

use async_trait::async_trait;
use domain::{GeoLocation, PlaceResult, SearchFilters};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// A place search request as handed to each backend
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSearchRequest {
    pub query: String,
    pub filters: SearchFilters,
    /// Search origin; geocoders use it as the proximity bias
    pub origin: GeoLocation,
}

/// Port for place search backends
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PlaceSearchPort: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Search places; an empty list is a valid (but unsuccessful) answer
    async fn search(
        &self,
        request: &PlaceSearchRequest,
    ) -> Result<Vec<PlaceResult>, ApplicationError>;
}
