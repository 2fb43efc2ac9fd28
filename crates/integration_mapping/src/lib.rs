//! Mapping backends for Wayfinder
//!
//! HTTP clients for the three external services the core talks to:
//!
//! - the primary place search service (`/search`)
//! - a geocoding service used as secondary search backend (`/geocode`)
//! - a directions service returning step-by-step route alternatives
//!   (`/directions/{profile}/{coordinates}`)
//!
//! # Architecture
//!
//! Each service has a client trait ([`PlaceSearchClient`], [`GeocodingClient`],
//! [`DirectionsClient`]) implemented by a reqwest-based client. Wire formats
//! stay inside this crate; callers only see domain types. An optional access
//! token from [`MappingConfig`] is sent with every request.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_mapping::{DirectionsClient, HttpDirectionsClient, MappingConfig};
//!
//! let client = HttpDirectionsClient::new(&MappingConfig::default())?;
//! let routes = client.directions(&query).await?;
//! ```

mod config;
mod directions;
mod error;
mod geocoding;
mod http;
mod models;
mod search;

pub use config::MappingConfig;
pub use directions::{DirectionsClient, HttpDirectionsClient};
pub use error::MappingError;
pub use geocoding::{GeocodingClient, HttpGeocodingClient};
pub use search::{HttpPlaceSearchClient, PlaceSearchClient, PlaceSearchParams};
