//! Straight-line distance and duration estimates
//!
//! Used whenever a backend omits a distance or duration, and to synthesise
//! degraded routes when no routing provider answers. Every function here is
//! total: non-finite inputs produce `0.0` rather than `NaN` or a panic.

use crate::value_objects::{GeoLocation, TransportMode};

/// Pure haversine estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceEstimator;

impl DistanceEstimator {
    /// Great-circle distance between two points in meters
    #[must_use]
    pub fn estimate(a: &GeoLocation, b: &GeoLocation) -> f64 {
        Self::sanitize(a.distance_meters(b))
    }

    /// Travel time in seconds for a distance at the mode's average speed
    #[must_use]
    pub fn estimate_duration(meters: f64, mode: TransportMode) -> f64 {
        Self::sanitize(Self::sanitize(meters) / mode.average_speed_mps())
    }

    /// Sum of consecutive segment distances along a path
    #[must_use]
    pub fn estimate_path(points: &[GeoLocation]) -> f64 {
        points
            .windows(2)
            .map(|pair| Self::estimate(&pair[0], &pair[1]))
            .sum()
    }

    /// Clamp a distance or duration to a finite, non-negative value
    #[must_use]
    pub fn sanitize(value: f64) -> f64 {
        if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_zero_for_same_point() {
        let paris = GeoLocation::paris();
        assert!(DistanceEstimator::estimate(&paris, &paris).abs() < f64::EPSILON);
    }

    #[test]
    fn duration_uses_speed_table() {
        let seconds = DistanceEstimator::estimate_duration(1_400.0, TransportMode::Walking);
        assert!((seconds - 1_000.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_inputs_yield_zero() {
        let broken = GeoLocation::new_unchecked(f64::NAN, 0.0);
        assert!(DistanceEstimator::estimate(&broken, &GeoLocation::paris()).abs() < f64::EPSILON);
        assert!(
            DistanceEstimator::estimate_duration(f64::INFINITY, TransportMode::Driving).abs()
                < f64::EPSILON
        );
        assert!(
            DistanceEstimator::estimate_duration(-10.0, TransportMode::Cycling).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn path_sums_segments() {
        let a = GeoLocation::paris();
        let b = a.offset(500.0, 0.0);
        let c = b.offset(500.0, 90.0);
        let total = DistanceEstimator::estimate_path(&[a, b, c]);
        assert!((total - 1_000.0).abs() < 1.0);
        assert!(DistanceEstimator::estimate_path(&[a]).abs() < f64::EPSILON);
    }
}
