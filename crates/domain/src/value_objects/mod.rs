//! Value Objects - Immutable, identity-less domain primitives

mod distance_unit;
mod geo_location;
mod place_category;
mod transport_mode;

pub use distance_unit::DistanceUnit;
pub use geo_location::{EARTH_RADIUS_METERS, GeoLocation, LonLat};
pub use place_category::{ColorTag, DEFAULT_CATEGORY, infer_category};
pub use transport_mode::TransportMode;
