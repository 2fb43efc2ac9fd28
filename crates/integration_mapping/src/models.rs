//! Wire models for the mapping backends and their conversion into domain types

use domain::{
    DEFAULT_CATEGORY, GeoLocation, LonLat, Maneuver, PlaceResult, PlaceSource, Route, Step,
    TransportMode, infer_category,
};
use serde::Deserialize;
use tracing::warn;

const METERS_PER_MILE: f64 = 1_609.344;

/// A distance or duration as sent by the search backend
///
/// Either a plain number (meters or seconds) or a display string such as
/// `"~2 km"` or `"~15 min"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawMeasure {
    Number(f64),
    Text(String),
}

impl RawMeasure {
    pub(crate) fn meters(&self) -> Option<f64> {
        match self {
            Self::Number(n) => finite(*n),
            Self::Text(text) => {
                let (value, unit) = split_measure(text)?;
                let factor = match unit.as_str() {
                    "" | "m" | "meter" | "meters" => 1.0,
                    "km" | "kilometer" | "kilometers" => 1_000.0,
                    "mi" | "mile" | "miles" => METERS_PER_MILE,
                    _ => return None,
                };
                finite(value * factor)
            },
        }
    }

    pub(crate) fn seconds(&self) -> Option<f64> {
        match self {
            Self::Number(n) => finite(*n),
            Self::Text(text) => {
                let (value, unit) = split_measure(text)?;
                let factor = match unit.as_str() {
                    "" | "s" | "sec" | "secs" | "seconds" => 1.0,
                    "min" | "mins" | "minute" | "minutes" => 60.0,
                    "h" | "hr" | "hour" | "hours" => 3_600.0,
                    _ => return None,
                };
                finite(value * factor)
            },
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn split_measure(text: &str) -> Option<(f64, String)> {
    let text = text.trim().trim_start_matches(['~', '≈']).trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(text.len());
    let value = text[..split].replace(',', ".").parse().ok()?;
    Some((value, text[split..].trim().to_lowercase()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// One place from the primary search backend
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSearchPlace {
    #[serde(default)]
    pub id: Option<RawId>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub distance: Option<RawMeasure>,
    #[serde(default)]
    pub duration: Option<RawMeasure>,
    #[serde(default, alias = "address")]
    pub place_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub opening_hours: Option<String>,
}

impl RawSearchPlace {
    pub(crate) fn into_place(self, query: &str, mode: TransportMode) -> Option<PlaceResult> {
        let Ok(coordinates) = GeoLocation::new(self.lat, self.lon) else {
            warn!(name = %self.name, lat = self.lat, lon = self.lon, "Skipping place with invalid coordinates");
            return None;
        };

        let id = self
            .id
            .map(RawId::into_string)
            .unwrap_or_else(|| format!("place-{}", coordinates.key_fragment(5)));
        let category = category_or_inferred(self.category, &self.name, query);

        let mut place = PlaceResult::new(id, self.name, coordinates, category, PlaceSource::Primary)
            .with_address(self.place_name.unwrap_or_default())
            .with_travel(
                self.distance.as_ref().and_then(RawMeasure::meters),
                self.duration.as_ref().and_then(RawMeasure::seconds),
                Some(mode),
            );
        place.rating = self.rating.filter(|r| r.is_finite());
        place.opening_hours = self.opening_hours.filter(|h| !h.trim().is_empty());
        Some(place)
    }
}

/// Geocoding response: a feature collection or a bare array of features
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawGeocodeResponse {
    Collection { features: Vec<RawFeature> },
    Bare(Vec<RawFeature>),
}

impl RawGeocodeResponse {
    pub(crate) fn into_features(self) -> Vec<RawFeature> {
        match self {
            Self::Collection { features } | Self::Bare(features) => features,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFeature {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub place_name: Option<String>,
    pub center: LonLat,
    #[serde(default)]
    pub properties: Option<RawFeatureProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawFeatureProperties {
    #[serde(default)]
    pub category: Option<String>,
}

impl RawFeature {
    pub(crate) fn into_place(self, query: &str) -> Option<PlaceResult> {
        let [lon, lat] = self.center;
        let Ok(coordinates) = GeoLocation::from_lon_lat(self.center) else {
            warn!(lat, lon, "Skipping feature with invalid center");
            return None;
        };

        let address = self.place_name.unwrap_or_default();
        let name = self
            .text
            .filter(|t| !t.trim().is_empty())
            .or_else(|| address.split(',').next().map(|s| s.trim().to_string()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| query.trim().to_string());
        let id = self
            .id
            .map(RawId::into_string)
            .unwrap_or_else(|| format!("geo-{}", coordinates.key_fragment(5)));
        let category = category_or_inferred(
            self.properties.and_then(|p| p.category),
            &name,
            query,
        );

        Some(
            PlaceResult::new(id, name, coordinates, category, PlaceSource::Geocoder)
                .with_address(address),
        )
    }
}

/// Backend category if it maps to a known one, else inferred from name or query
fn category_or_inferred(raw: Option<String>, name: &str, query: &str) -> String {
    let from_raw = raw
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(infer_category)
        .filter(|c| *c != DEFAULT_CATEGORY);
    if let Some(category) = from_raw {
        return category.to_string();
    }
    if let Some(raw) = raw.filter(|c| !c.trim().is_empty()) {
        return raw.trim().to_lowercase();
    }
    match infer_category(name) {
        DEFAULT_CATEGORY => infer_category(query).to_string(),
        category => category.to_string(),
    }
}

/// Directions response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawDirectionsResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<RawRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRoute {
    pub distance: f64,
    pub duration: f64,
    pub geometry: RawGeometry,
    #[serde(default)]
    pub legs: Vec<RawLeg>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawGeometry {
    #[serde(default)]
    pub coordinates: Vec<LonLat>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLeg {
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawStep {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
    pub maneuver: RawManeuver,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawManeuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

impl RawStep {
    fn into_step(self) -> Step {
        let maneuver = Maneuver::parse(&self.maneuver.kind, self.maneuver.modifier.as_deref());
        let instruction = self
            .maneuver
            .instruction
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| match self.name.as_deref().map(str::trim) {
                Some(street) if !street.is_empty() => format!("{} on {street}", maneuver.describe()),
                _ => maneuver.describe(),
            });
        Step {
            instruction,
            distance_meters: finite(self.distance).unwrap_or(0.0),
            duration_seconds: finite(self.duration).unwrap_or(0.0),
            maneuver,
        }
    }
}

impl RawRoute {
    pub(crate) fn into_route(self, mode: TransportMode) -> Route {
        let distance_meters = finite(self.distance).unwrap_or(0.0);
        let duration_seconds = finite(self.duration).unwrap_or(0.0);
        let mut legs: Vec<Step> = self
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(RawStep::into_step)
            .collect();
        if legs.is_empty() {
            legs.push(Step {
                instruction: Maneuver::Depart.describe(),
                distance_meters,
                duration_seconds,
                maneuver: Maneuver::Depart,
            });
        }

        Route {
            distance_meters,
            duration_seconds,
            geometry: self.geometry.coordinates,
            legs,
            transport_mode: mode,
            degraded: false,
        }
    }
}
