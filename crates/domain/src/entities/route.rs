//! Route entities
//!
//! A [`RouteQuery`] names the points to connect; a [`Route`] is the immutable
//! answer, either from a directions backend or synthesised as a straight line
//! when none is reachable (`degraded == true`).

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::estimator::DistanceEstimator;
use crate::value_objects::{GeoLocation, LonLat, TransportMode};

/// Coordinate precision of route cache keys (about one meter)
const ROUTE_KEY_DECIMALS: usize = 5;

/// Points to route between, in travel order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub origin: GeoLocation,
    pub destination: GeoLocation,
    pub waypoints: Vec<GeoLocation>,
    pub transport_mode: TransportMode,
}

impl RouteQuery {
    /// Route directly from origin to destination
    #[must_use]
    pub const fn new(
        origin: GeoLocation,
        destination: GeoLocation,
        transport_mode: TransportMode,
    ) -> Self {
        Self {
            origin,
            destination,
            waypoints: Vec::new(),
            transport_mode,
        }
    }

    /// Add intermediate stops
    #[must_use]
    pub fn with_waypoints(mut self, waypoints: Vec<GeoLocation>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// Same points with a different mode
    #[must_use]
    pub fn for_mode(&self, transport_mode: TransportMode) -> Self {
        Self {
            transport_mode,
            ..self.clone()
        }
    }

    /// All points: origin, waypoints, destination
    #[must_use]
    pub fn points(&self) -> Vec<GeoLocation> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(self.origin);
        points.extend(self.waypoints.iter().copied());
        points.push(self.destination);
        points
    }

    /// Ensure the query connects at least two distinct points
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidRouteQuery` when every point collapses to
    /// the same canonical coordinate.
    pub fn validate(&self) -> Result<(), DomainError> {
        let first = self.origin.key_fragment(ROUTE_KEY_DECIMALS);
        let all_same = self
            .points()
            .iter()
            .all(|p| p.key_fragment(ROUTE_KEY_DECIMALS) == first);
        if all_same {
            return Err(DomainError::invalid_route_query(
                "fewer than two distinct points",
            ));
        }
        Ok(())
    }

    /// Canonical string form used inside cache keys
    #[must_use]
    pub fn key_fragment(&self) -> String {
        let points: Vec<String> = self
            .points()
            .iter()
            .map(|p| p.key_fragment(ROUTE_KEY_DECIMALS))
            .collect();
        format!("{}|{}", self.transport_mode, points.join(";"))
    }
}

/// Kind of maneuver at the start of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Maneuver {
    Depart,
    Turn { modifier: Option<String> },
    Continue,
    Merge,
    Fork { modifier: Option<String> },
    Roundabout,
    ExitRoundabout,
    Arrive,
    Other { kind: String },
}

impl Maneuver {
    /// Build from the backend's `type` and optional `modifier`
    #[must_use]
    pub fn parse(kind: &str, modifier: Option<&str>) -> Self {
        let modifier = modifier.map(str::to_string);
        match kind.trim().to_lowercase().as_str() {
            "depart" => Self::Depart,
            "turn" | "end of road" => Self::Turn { modifier },
            "continue" | "new name" => Self::Continue,
            "merge" | "on ramp" => Self::Merge,
            "fork" | "off ramp" => Self::Fork { modifier },
            "roundabout" | "rotary" | "roundabout turn" => Self::Roundabout,
            "exit roundabout" | "exit rotary" => Self::ExitRoundabout,
            "arrive" => Self::Arrive,
            other => Self::Other {
                kind: other.to_string(),
            },
        }
    }

    /// Human instruction for backends that omit one
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Depart => "Start navigation".to_string(),
            Self::Turn { modifier } => format!("Turn {}", side(modifier.as_deref())),
            Self::Continue => "Continue straight".to_string(),
            Self::Merge => "Merge into traffic".to_string(),
            Self::Fork { modifier } => format!("Keep {} at the fork", side(modifier.as_deref())),
            Self::Roundabout => "Enter the roundabout".to_string(),
            Self::ExitRoundabout => "Exit the roundabout".to_string(),
            Self::Arrive => "You have arrived at your destination".to_string(),
            Self::Other { .. } => "Follow the route".to_string(),
        }
    }
}

fn side(modifier: Option<&str>) -> &'static str {
    match modifier {
        Some(m) if m.contains("right") => "right",
        _ => "left",
    }
}

/// One instruction of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub instruction: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub maneuver: Maneuver,
}

/// A computed route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Path as `[lon, lat]` pairs
    pub geometry: Vec<LonLat>,
    /// Steps in travel order; never empty
    pub legs: Vec<Step>,
    pub transport_mode: TransportMode,
    /// True when synthesised locally instead of computed by a backend
    pub degraded: bool,
}

impl Route {
    /// Synthesise a straight-line route through the query's points
    ///
    /// The geometry is origin, waypoints, destination. Distance is the sum of
    /// haversine segments and duration follows the mode's average speed.
    #[must_use]
    pub fn straight_line(query: &RouteQuery) -> Self {
        let points = query.points();
        let distance_meters = DistanceEstimator::estimate_path(&points);
        let duration_seconds =
            DistanceEstimator::estimate_duration(distance_meters, query.transport_mode);

        Self {
            distance_meters,
            duration_seconds,
            geometry: points.iter().map(GeoLocation::to_lon_lat).collect(),
            legs: vec![Step {
                instruction: "Head straight toward the destination".to_string(),
                distance_meters,
                duration_seconds,
                maneuver: Maneuver::Depart,
            }],
            transport_mode: query.transport_mode,
            degraded: true,
        }
    }

    /// Sum of step durations; falls back to the route duration
    #[must_use]
    pub fn steps_duration_seconds(&self) -> f64 {
        let total: f64 = self.legs.iter().map(|s| s.duration_seconds.max(0.0)).sum();
        if total > 0.0 {
            total
        } else {
            self.duration_seconds.max(0.0)
        }
    }

    /// Index of the last step
    #[must_use]
    pub fn last_step_index(&self) -> usize {
        self.legs.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> RouteQuery {
        let origin = GeoLocation::paris();
        RouteQuery::new(origin, origin.offset(2_000.0, 45.0), TransportMode::Walking)
    }

    #[test]
    fn straight_line_matches_estimate() {
        let q = query();
        let route = Route::straight_line(&q);
        let expected = DistanceEstimator::estimate(&q.origin, &q.destination);
        assert!(route.degraded);
        assert_eq!(route.geometry.len(), 2);
        assert_eq!(route.legs.len(), 1);
        assert!((route.distance_meters - expected).abs() < 1e-6);
        assert_eq!(route.geometry[0], q.origin.to_lon_lat());
    }

    #[test]
    fn straight_line_includes_waypoints() {
        let q = query().with_waypoints(vec![GeoLocation::paris().offset(500.0, 0.0)]);
        let route = Route::straight_line(&q);
        assert_eq!(route.geometry.len(), 3);
    }

    #[test]
    fn validate_rejects_single_point() {
        let p = GeoLocation::paris();
        let q = RouteQuery::new(p, p, TransportMode::Driving);
        assert!(q.validate().is_err());
        assert!(query().validate().is_ok());
    }

    #[test]
    fn key_fragment_depends_on_mode() {
        let q = query();
        assert_ne!(
            q.key_fragment(),
            q.for_mode(TransportMode::Cycling).key_fragment()
        );
    }

    #[test]
    fn maneuver_parsing_and_description() {
        let turn = Maneuver::parse("turn", Some("sharp right"));
        assert_eq!(turn.describe(), "Turn right");
        assert_eq!(Maneuver::parse("exit roundabout", None), Maneuver::ExitRoundabout);
        assert_eq!(
            Maneuver::parse("notification", None).describe(),
            "Follow the route"
        );
    }
}
