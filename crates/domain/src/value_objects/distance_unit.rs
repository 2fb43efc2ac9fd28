//! Distance unit for search radius filters

use serde::{Deserialize, Serialize};

const METERS_PER_KILOMETER: f64 = 1_000.0;
const METERS_PER_MILE: f64 = 1_609.344;

/// Unit in which a user expresses a search radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
}

impl DistanceUnit {
    /// Convert a value in this unit to meters
    #[must_use]
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Kilometers => value * METERS_PER_KILOMETER,
            Self::Miles => value * METERS_PER_MILE,
        }
    }

    /// Short label ("km" / "mi")
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Kilometers => "km",
            Self::Miles => "mi",
        }
    }
}
