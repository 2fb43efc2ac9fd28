//! Place search entities

use serde::{Deserialize, Serialize};

use crate::value_objects::{ColorTag, DistanceUnit, GeoLocation, TransportMode};

/// Where a place result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaceSource {
    /// Primary search backend
    #[default]
    Primary,
    /// Secondary geocoding backend
    Geocoder,
    /// Realtime push channel
    Realtime,
    /// Local simulated generator (no network)
    Simulated,
    /// Durable cache served while all backends were unreachable
    Offline,
}

/// A single place returned by a search
///
/// Results are immutable once produced; filtering and enrichment build new
/// values instead of mutating shared ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    /// Identifier, unique within one result set
    pub id: String,
    pub name: String,
    pub coordinates: GeoLocation,
    pub address: String,
    pub category: String,
    /// Distance from the search origin, when known
    pub distance_meters: Option<f64>,
    /// Travel time from the search origin, when known
    pub duration_seconds: Option<f64>,
    /// Mode `duration_seconds` was computed for
    pub transport_mode: Option<TransportMode>,
    pub color_tag: ColorTag,
    pub rating: Option<f32>,
    pub opening_hours: Option<String>,
    pub source: PlaceSource,
}

impl PlaceResult {
    /// Create a result with the color derived from its category
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        coordinates: GeoLocation,
        category: impl Into<String>,
        source: PlaceSource,
    ) -> Self {
        let category = category.into();
        Self {
            id: id.into(),
            name: name.into(),
            coordinates,
            address: String::new(),
            color_tag: ColorTag::for_category(&category),
            category,
            distance_meters: None,
            duration_seconds: None,
            transport_mode: None,
            rating: None,
            opening_hours: None,
            source,
        }
    }

    /// Set the address
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set distance and duration as reported by a backend
    #[must_use]
    pub const fn with_travel(
        mut self,
        distance_meters: Option<f64>,
        duration_seconds: Option<f64>,
        mode: Option<TransportMode>,
    ) -> Self {
        self.distance_meters = distance_meters;
        self.duration_seconds = duration_seconds;
        self.transport_mode = mode;
        self
    }

    /// Re-tag the result with another source
    #[must_use]
    pub const fn with_source(mut self, source: PlaceSource) -> Self {
        self.source = source;
        self
    }

    /// True only for results from the local simulated generator
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        matches!(self.source, PlaceSource::Simulated)
    }

    /// Distance for sorting; unknown distances sort last
    #[must_use]
    pub fn sort_distance(&self) -> f64 {
        self.distance_meters.unwrap_or(f64::MAX)
    }
}

/// User-selected filters applied to a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Category to keep (case-insensitive exact or substring match)
    pub category: Option<String>,
    /// Maximum distance in `unit`
    pub radius: Option<f64>,
    pub unit: DistanceUnit,
    /// Maximum travel time in minutes for `transport_mode`
    pub max_duration_minutes: Option<u32>,
    pub transport_mode: TransportMode,
    /// Maximum number of results to return
    pub results_count: usize,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            category: None,
            radius: None,
            unit: DistanceUnit::Kilometers,
            max_duration_minutes: None,
            transport_mode: TransportMode::Driving,
            results_count: 10,
        }
    }
}

impl SearchFilters {
    /// Radius converted to meters
    #[must_use]
    pub fn radius_meters(&self) -> Option<f64> {
        self.radius.map(|r| self.unit.to_meters(r))
    }

    /// Maximum duration converted to seconds
    #[must_use]
    pub fn max_duration_seconds(&self) -> Option<f64> {
        self.max_duration_minutes.map(|m| f64::from(m) * 60.0)
    }

    /// Whether a category matches this filter
    #[must_use]
    pub fn matches_category(&self, category: &str) -> bool {
        self.category.as_deref().is_none_or(|wanted| {
            let wanted = wanted.trim().to_lowercase();
            let actual = category.to_lowercase();
            wanted.is_empty() || actual == wanted || actual.contains(&wanted)
        })
    }

    /// Stable string form used inside cache keys
    #[must_use]
    pub fn key_fragment(&self) -> String {
        format!(
            "cat={}|r={}|u={}|d={}|m={}|n={}",
            self.category
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_default(),
            self.radius.map(|r| format!("{r:.3}")).unwrap_or_default(),
            self.unit.label(),
            self.max_duration_minutes
                .map(|d| d.to_string())
                .unwrap_or_default(),
            self.transport_mode,
            self.results_count
        )
    }
}
