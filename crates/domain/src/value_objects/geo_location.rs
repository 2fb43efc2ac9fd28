//! Geographic location value object

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DomainError;

/// A `[longitude, latitude]` pair, the wire order used by route geometry
pub type LonLat = [f64; 2];

/// Mean Earth radius used for great-circle distances, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A geographic location with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in degrees (-90 to 90)
    latitude: f64,
    /// Longitude in degrees (-180 to 180)
    longitude: f64,
}

impl GeoLocation {
    /// Create a new location with validation
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCoordinates` if latitude is not in
    /// [-90, 90], longitude is not in [-180, 180], or either is not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::InvalidCoordinates(format!(
                "lat={latitude}, lon={longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Create a location without validation (for trusted sources)
    ///
    /// Caller must ensure latitude is in [-90, 90] and longitude in [-180, 180]
    #[must_use]
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a location from a `[lon, lat]` geometry coordinate
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCoordinates` for out-of-range values.
    pub fn from_lon_lat(coord: LonLat) -> Result<Self, DomainError> {
        Self::new(coord[1], coord[0])
    }

    /// Get the latitude
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Get the longitude
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Convert to `[lon, lat]` wire order
    #[must_use]
    pub const fn to_lon_lat(&self) -> LonLat {
        [self.longitude, self.latitude]
    }

    /// Great-circle distance to another location in meters (haversine)
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let lat1_rad = self.latitude.to_radians();
        let lat2_rad = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (lat1_rad.cos() * lat2_rad.cos()).mul_add(
            (delta_lon / 2.0).sin().powi(2),
            (delta_lat / 2.0).sin().powi(2),
        );
        // Rounding can push `a` marginally past 1 for antipodal points.
        let a = a.clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }

    /// Render the coordinate pair with a fixed number of decimals
    ///
    /// Used to canonicalise coordinates inside cache keys: 3 decimals is
    /// roughly 100 m, 5 decimals roughly 1 m.
    #[must_use]
    pub fn key_fragment(&self, decimals: usize) -> String {
        // `+ 0.0` folds negative zero so -0.0001 and 0.0001 share a key.
        format!(
            "{:.prec$},{:.prec$}",
            round_to(self.latitude, decimals) + 0.0,
            round_to(self.longitude, decimals) + 0.0,
            prec = decimals
        )
    }

    /// Move by a distance along a bearing, returning the destination point
    ///
    /// `bearing_degrees` is measured clockwise from north.
    #[must_use]
    pub fn offset(&self, distance_meters: f64, bearing_degrees: f64) -> Self {
        let angular = distance_meters / EARTH_RADIUS_METERS;
        let bearing = bearing_degrees.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = lat1
            .sin()
            .mul_add(angular.cos(), lat1.cos() * angular.sin() * bearing.cos())
            .asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(lat1.sin().mul_add(-lat2.sin(), angular.cos()));

        let longitude = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
        Self::new_unchecked(lat2.to_degrees().clamp(-90.0, 90.0), longitude)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

impl fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Common locations for defaults
impl GeoLocation {
    /// Paris, France (the default search origin)
    #[must_use]
    pub const fn paris() -> Self {
        Self::new_unchecked(48.8566, 2.3522)
    }

    /// London, UK
    #[must_use]
    pub const fn london() -> Self {
        Self::new_unchecked(51.5074, -0.1278)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        let loc = GeoLocation::new(48.8566, 2.3522).expect("valid coordinates");
        assert!((loc.latitude() - 48.8566).abs() < f64::EPSILON);
        assert!((loc.longitude() - 2.3522).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boundary_coordinates() {
        assert!(GeoLocation::new(90.0, 180.0).is_ok());
        assert!(GeoLocation::new(-90.0, -180.0).is_ok());
        assert!(GeoLocation::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(GeoLocation::new(91.0, 0.0).is_err());
        assert!(GeoLocation::new(0.0, -181.0).is_err());
        assert!(GeoLocation::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_lon_lat_order() {
        let loc = GeoLocation::paris();
        assert_eq!(loc.to_lon_lat(), [2.3522, 48.8566]);
        let back = GeoLocation::from_lon_lat([2.3522, 48.8566]).expect("valid");
        assert_eq!(back, loc);
    }

    #[test]
    fn test_distance_same_location() {
        let loc = GeoLocation::paris();
        assert!(loc.distance_meters(&loc).abs() < 0.001);
    }

    #[test]
    fn test_distance_paris_london() {
        let distance = GeoLocation::paris().distance_meters(&GeoLocation::london());
        // Paris to London is approximately 344 km
        assert!((distance - 344_000.0).abs() < 5_000.0);
    }

    #[test]
    fn test_key_fragment_rounds() {
        let a = GeoLocation::new(48.85661, 2.35219).expect("valid");
        let b = GeoLocation::new(48.85651, 2.35224).expect("valid");
        assert_eq!(a.key_fragment(3), b.key_fragment(3));
        assert_eq!(a.key_fragment(3), "48.857,2.352");
        assert_ne!(a.key_fragment(5), b.key_fragment(5));
    }

    #[test]
    fn test_key_fragment_negative_zero() {
        let a = GeoLocation::new(-0.0001, 0.0).expect("valid");
        let b = GeoLocation::new(0.0001, 0.0).expect("valid");
        assert_eq!(a.key_fragment(3), b.key_fragment(3));
    }

    #[test]
    fn test_offset_distance() {
        let origin = GeoLocation::paris();
        let moved = origin.offset(1_000.0, 90.0);
        let distance = origin.distance_meters(&moved);
        assert!((distance - 1_000.0).abs() < 1.0);
    }

    #[test]
    fn test_serialization() {
        let loc = GeoLocation::paris();
        let json = serde_json::to_string(&loc).expect("serialize");
        let deserialized: GeoLocation = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loc, deserialized);
    }
}
