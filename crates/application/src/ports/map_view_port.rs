//! Map view port
//!
//! The narrow side-effecting adapter between the map reconciler and a
//! concrete map library. Implementations translate these calls into marker,
//! popup and line-layer operations and forward marker clicks back to
//! `MapReconciler::select`.

use domain::{ColorTag, LonLat};
#[cfg(test)]
use mockall::automock;

/// Opaque handle to a marker created by a map view
///
/// Only the map reconciler holds these; the wrapped value is whatever the
/// adapter needs to find its marker again.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    /// Wrap an adapter-specific marker id
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Adapter-specific marker id
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Text shown in a marker popup
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopupContent {
    pub title: String,
    pub address: String,
    pub distance: Option<String>,
    pub duration: Option<String>,
    pub opening_hours: Option<String>,
    pub rating: Option<String>,
}

/// Everything a map view needs to draw one result marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: String,
    pub position: LonLat,
    /// One-based label shown on the marker
    pub label: String,
    pub color: ColorTag,
    pub selected: bool,
    pub popup: PopupContent,
}

/// Port to a live map
#[cfg_attr(test, automock)]
pub trait MapViewPort: Send + Sync {
    /// False once the underlying map has been torn down
    fn is_alive(&self) -> bool;

    fn create_marker(&self, spec: &MarkerSpec) -> MarkerHandle;

    fn update_marker(&self, handle: &MarkerHandle, spec: &MarkerSpec);

    fn remove_marker(&self, handle: &MarkerHandle);

    fn show_popup(&self, handle: &MarkerHandle);

    fn hide_popup(&self, handle: &MarkerHandle);

    /// Add a line layer (and its source) for a route geometry
    fn add_route_layer(&self, layer_id: &str, geometry: &[LonLat], color: &str);

    /// Reveal phase: opacity and dash progress, both in `[0, 1]`
    fn set_route_reveal(&self, layer_id: &str, opacity: f64, dash_progress: f64);

    /// Move the animated point of a route layer
    fn set_route_point(&self, layer_id: &str, position: LonLat);

    /// Remove a route layer, its source and its animated point
    fn remove_route_layer(&self, layer_id: &str);
}
