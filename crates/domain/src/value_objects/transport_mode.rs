//! Transport mode value object
//!
//! Selects the directions profile for routing and the average speed used by
//! the distance estimator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mode of transport for routes and duration estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Car, without live traffic
    #[default]
    Driving,
    /// Car, routed with live traffic
    DrivingTraffic,
    /// On foot
    Walking,
    /// Bicycle
    Cycling,
    /// Public transport
    Transit,
}

impl TransportMode {
    /// All modes, in display order
    pub const ALL: [Self; 5] = [
        Self::Driving,
        Self::DrivingTraffic,
        Self::Walking,
        Self::Cycling,
        Self::Transit,
    ];

    /// Average travel speed in meters per second
    #[must_use]
    pub const fn average_speed_mps(&self) -> f64 {
        match self {
            Self::Driving | Self::DrivingTraffic => 13.9,
            Self::Walking => 1.4,
            Self::Cycling => 4.2,
            Self::Transit => 8.3,
        }
    }

    /// Name of the directions profile for this mode
    #[must_use]
    pub const fn profile(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::DrivingTraffic => "driving-traffic",
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Transit => "transit",
        }
    }

    /// Parse a mode leniently; unknown names fall back to driving
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "driving" | "car" => Ok(Self::Driving),
            "driving-traffic" | "driving_traffic" | "traffic" => Ok(Self::DrivingTraffic),
            "walking" | "walk" | "foot" => Ok(Self::Walking),
            "cycling" | "bike" | "bicycle" => Ok(Self::Cycling),
            "transit" | "public" | "bus" => Ok(Self::Transit),
            _ => Err("Invalid transport mode"),
        }
    }
}
