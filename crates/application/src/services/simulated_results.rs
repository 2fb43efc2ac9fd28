//! Local simulated search results
//!
//! Produces plausible places scattered around the origin so the UI keeps
//! working while the realtime channel is unreachable. Output is deterministic
//! for a given query and origin, and every result is tagged `Simulated`.

use std::time::Duration;

use domain::{
    DistanceEstimator, GeoLocation, PlaceResult, PlaceSource, SearchFilters, infer_category,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Radius used when the filters do not set one
const DEFAULT_RADIUS_METERS: f64 = 5_000.0;

const STREETS: &[&str] = &[
    "Rue de Rivoli",
    "Boulevard Saint-Germain",
    "Avenue de l'Opéra",
    "Rue du Faubourg Saint-Antoine",
    "Quai de la Tournelle",
    "Rue Oberkampf",
];

/// Generator for simulated results
#[derive(Debug, Clone)]
pub struct SimulatedResults {
    delay: Duration,
}

impl SimulatedResults {
    /// Create a generator that waits `delay` before answering
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait the artificial delay, then generate
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        origin: &GeoLocation,
    ) -> Vec<PlaceResult> {
        tokio::time::sleep(self.delay).await;
        Self::generate(query, filters, origin)
    }

    /// Generate results immediately
    #[must_use]
    pub fn generate(query: &str, filters: &SearchFilters, origin: &GeoLocation) -> Vec<PlaceResult> {
        let seed = seed_for(query, origin);
        let mut rng = StdRng::seed_from_u64(seed);
        let radius = filters
            .radius_meters()
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_RADIUS_METERS);
        let label = display_label(query);
        let category = filters
            .category
            .clone()
            .unwrap_or_else(|| infer_category(query).to_string());
        let mode = filters.transport_mode;

        (0..filters.results_count)
            .map(|i| {
                let distance = rng.random_range(0.05..1.0) * radius;
                let bearing = rng.random_range(0.0..360.0);
                let coordinates = origin.offset(distance, bearing);
                let measured = DistanceEstimator::estimate(origin, &coordinates);
                let street = STREETS[rng.random_range(0..STREETS.len())];
                let number = rng.random_range(1..120);
                let rating = f32::from(rng.random_range(30u8..=50)) / 10.0;

                let mut result = PlaceResult::new(
                    format!("sim-{seed:016x}-{i}"),
                    format!("{label} {}", i + 1),
                    coordinates,
                    category.clone(),
                    PlaceSource::Simulated,
                )
                .with_address(format!("{number} {street}"))
                .with_travel(
                    Some(measured),
                    Some(DistanceEstimator::estimate_duration(measured, mode)),
                    Some(mode),
                );
                result.rating = Some(rating);
                result
            })
            .collect()
    }
}

fn seed_for(query: &str, origin: &GeoLocation) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(query.trim().to_lowercase().as_bytes());
    hasher.update(origin.key_fragment(5).as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

fn display_label(query: &str) -> String {
    let trimmed = query.trim();
    let mut chars = trimmed.chars();
    chars.next().map_or_else(
        || "Place".to_string(),
        |first| first.to_uppercase().chain(chars).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DistanceUnit;

    fn filters() -> SearchFilters {
        SearchFilters {
            radius: Some(2.0),
            unit: DistanceUnit::Kilometers,
            results_count: 6,
            ..Default::default()
        }
    }

    #[test]
    fn results_are_simulated_and_within_radius() {
        let origin = GeoLocation::paris();
        let results = SimulatedResults::generate("pizza", &filters(), &origin);

        assert_eq!(results.len(), 6);
        for result in &results {
            assert!(result.is_simulated());
            assert!(result.distance_meters.unwrap() <= 2_000.0 + 1.0);
            assert!(result.name.starts_with("Pizza"));
        }
    }

    #[test]
    fn deterministic_per_query_and_origin() {
        let origin = GeoLocation::paris();
        let a = SimulatedResults::generate("pizza", &filters(), &origin);
        let b = SimulatedResults::generate("pizza", &filters(), &origin);
        let c = SimulatedResults::generate("sushi", &filters(), &origin);
        assert_eq!(a, b);
        assert_ne!(a[0].coordinates, c[0].coordinates);
    }

    #[test]
    fn category_comes_from_filter_or_query() {
        let origin = GeoLocation::paris();
        let inferred = SimulatedResults::generate("hotel", &filters(), &origin);
        assert_eq!(inferred[0].category, "lodging");

        let explicit = SearchFilters {
            category: Some("shopping".to_string()),
            ..filters()
        };
        let results = SimulatedResults::generate("hotel", &explicit, &origin);
        assert_eq!(results[0].category, "shopping");
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_artificial_delay() {
        let generator = SimulatedResults::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        let results = generator
            .search("cafe", &filters(), &GeoLocation::paris())
            .await;
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(!results.is_empty());
    }
}
