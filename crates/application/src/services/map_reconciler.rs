//! Map reconciliation
//!
//! Keeps the markers on a live map in step with the current result list by
//! diffing against what is already rendered, and owns the route layer with
//! its entrance animation. Nothing else talks to the [`MapViewPort`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use domain::{LonLat, PlaceResult, Route};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::ports::{MapViewPort, MarkerHandle, MarkerSpec, PopupContent};

/// Default line color for drawn routes
pub const DEFAULT_ROUTE_COLOR: &str = "#3b82f6";

/// Map reconciler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Length of the route reveal phase
    #[serde(default = "default_reveal_duration_ms")]
    pub reveal_duration_ms: u64,

    /// Time between reveal frames
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Time the animated point spends on each coordinate
    #[serde(default = "default_point_step_ms")]
    pub point_step_ms: u64,

    #[serde(default = "default_route_color")]
    pub route_color: String,
}

const fn default_reveal_duration_ms() -> u64 {
    1500
}

const fn default_frame_interval_ms() -> u64 {
    16
}

const fn default_point_step_ms() -> u64 {
    50
}

fn default_route_color() -> String {
    DEFAULT_ROUTE_COLOR.to_string()
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reveal_duration_ms: default_reveal_duration_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            point_step_ms: default_point_step_ms(),
            route_color: default_route_color(),
        }
    }
}

impl ReconcilerConfig {
    /// A short reveal so animations finish quickly under test
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            reveal_duration_ms: 64,
            frame_interval_ms: 16,
            point_step_ms: 10,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_interval_ms == 0 {
            return Err("frame_interval_ms must be greater than 0".to_string());
        }
        if self.frame_interval_ms > self.reveal_duration_ms {
            return Err("frame_interval_ms must not exceed reveal_duration_ms".to_string());
        }
        Ok(())
    }

    fn reveal_frames(&self) -> u64 {
        (self.reveal_duration_ms / self.frame_interval_ms.max(1)).max(1)
    }
}

/// What a `sync` call changed on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Invoked after a marker was selected and its popup shown
pub type SelectCallback = Arc<dyn Fn(&PlaceResult) + Send + Sync>;

struct Rendered {
    handle: MarkerHandle,
    spec: MarkerSpec,
    result: PlaceResult,
}

#[derive(Default)]
struct MapState {
    markers: HashMap<String, Rendered>,
    selected: Option<String>,
    open_popup: Option<String>,
    route_layers: Vec<String>,
    layer_seq: u64,
}

/// Reconciles result markers and route layers onto a map view
pub struct MapReconciler {
    view: Arc<dyn MapViewPort>,
    config: ReconcilerConfig,
    state: Mutex<MapState>,
    animation: Mutex<Option<JoinHandle<()>>>,
    on_select: RwLock<Option<SelectCallback>>,
}

impl std::fmt::Debug for MapReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MapReconciler")
            .field("markers", &state.markers.len())
            .field("selected", &state.selected)
            .field("route_layers", &state.route_layers)
            .finish_non_exhaustive()
    }
}

impl MapReconciler {
    pub fn new(view: Arc<dyn MapViewPort>, config: ReconcilerConfig) -> Self {
        Self {
            view,
            config,
            state: Mutex::new(MapState::default()),
            animation: Mutex::new(None),
            on_select: RwLock::new(None),
        }
    }

    /// Set the callback run when a result marker is selected
    pub fn on_select<F>(&self, callback: F)
    where
        F: Fn(&PlaceResult) + Send + Sync + 'static,
    {
        *self.on_select.write() = Some(Arc::new(callback));
    }

    /// Number of markers currently rendered
    pub fn marker_count(&self) -> usize {
        self.state.lock().markers.len()
    }

    pub fn selected_id(&self) -> Option<String> {
        self.state.lock().selected.clone()
    }

    /// Route layers this reconciler has added and not yet removed
    pub fn route_layers(&self) -> Vec<String> {
        self.state.lock().route_layers.clone()
    }

    /// Diff `results` against the rendered markers
    ///
    /// Markers whose id is kept are updated in place, never recreated.
    /// `selected_id` is authoritative: an id not among `results` clears the
    /// selection.
    #[instrument(skip(self, results), fields(count = results.len()))]
    pub fn sync(&self, results: &[PlaceResult], selected_id: Option<&str>) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.view.is_alive() {
            debug!("Map torn down, skipping sync");
            return report;
        }

        let incoming: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
        let selected = selected_id
            .filter(|id| incoming.contains(id))
            .map(str::to_string);

        let mut state = self.state.lock();

        let stale: Vec<String> = state
            .markers
            .keys()
            .filter(|id| !incoming.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(rendered) = state.markers.remove(&id) {
                self.view.hide_popup(&rendered.handle);
                self.view.remove_marker(&rendered.handle);
                report.removed += 1;
            }
            if state.open_popup.as_deref() == Some(id.as_str()) {
                state.open_popup = None;
            }
        }

        let mut seen = HashSet::new();
        for (index, result) in results.iter().enumerate() {
            if !seen.insert(result.id.as_str()) {
                continue;
            }
            let is_selected = selected.as_deref() == Some(result.id.as_str());
            let spec = marker_spec(result, index, is_selected);
            match state.markers.get_mut(&result.id) {
                Some(rendered) => {
                    self.view.update_marker(&rendered.handle, &spec);
                    rendered.spec = spec;
                    rendered.result = result.clone();
                    report.updated += 1;
                },
                None => {
                    let handle = self.view.create_marker(&spec);
                    state.markers.insert(
                        result.id.clone(),
                        Rendered {
                            handle,
                            spec,
                            result: result.clone(),
                        },
                    );
                    report.created += 1;
                },
            }
        }

        if state.open_popup != selected {
            if let Some(open) = state.open_popup.take() {
                if let Some(rendered) = state.markers.get(&open) {
                    self.view.hide_popup(&rendered.handle);
                }
            }
            if let Some(id) = selected.as_deref() {
                if let Some(rendered) = state.markers.get(id) {
                    self.view.show_popup(&rendered.handle);
                }
            }
            state.open_popup.clone_from(&selected);
        }
        state.selected = selected;

        debug!(
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            "Markers reconciled"
        );
        report
    }

    /// Select a rendered result, as when its marker is clicked
    ///
    /// Deselects the previous marker and closes any other popup before
    /// opening this one; the select callback runs last. Returns `None` for
    /// unknown ids or a torn-down map.
    #[instrument(skip(self))]
    pub fn select(&self, id: &str) -> Option<PlaceResult> {
        if !self.view.is_alive() {
            return None;
        }

        let result = {
            let mut state = self.state.lock();
            if !state.markers.contains_key(id) {
                debug!("Select for unknown marker");
                return None;
            }

            if let Some(previous) = state.selected.take() {
                if previous != id {
                    if let Some(rendered) = state.markers.get_mut(&previous) {
                        self.set_marker_selected(rendered, false);
                    }
                }
            }
            if let Some(open) = state.open_popup.take() {
                if open != id {
                    if let Some(rendered) = state.markers.get(&open) {
                        self.view.hide_popup(&rendered.handle);
                    }
                }
            }

            let rendered = state.markers.get_mut(id)?;
            self.set_marker_selected(rendered, true);
            self.view.show_popup(&rendered.handle);
            let result = rendered.result.clone();
            state.selected = Some(id.to_string());
            state.open_popup = Some(id.to_string());
            result
        };

        let callback = self.on_select.read().clone();
        if let Some(callback) = callback {
            callback(&result);
        }
        Some(result)
    }

    fn set_marker_selected(&self, rendered: &mut Rendered, selected: bool) {
        if rendered.spec.selected != selected {
            rendered.spec.selected = selected;
            self.view.update_marker(&rendered.handle, &rendered.spec);
        }
    }

    /// Draw `route`, replacing any previous route layer
    ///
    /// Returns the new layer id, or `None` when the map is gone. Outside a
    /// Tokio runtime the route is shown fully revealed without animation.
    #[instrument(skip(self, route), fields(points = route.geometry.len()))]
    pub fn draw_route(&self, route: Arc<Route>, color: Option<&str>) -> Option<String> {
        if !self.view.is_alive() {
            return None;
        }
        self.cancel_animation();

        let layer_id = {
            let mut state = self.state.lock();
            for layer in state.route_layers.drain(..) {
                self.view.remove_route_layer(&layer);
            }
            state.layer_seq += 1;
            let layer_id = format!("route-{}", state.layer_seq);
            state.route_layers.push(layer_id.clone());
            layer_id
        };

        let color = color.unwrap_or(&self.config.route_color);
        self.view.add_route_layer(&layer_id, &route.geometry, color);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(animate_route(
                    Arc::clone(&self.view),
                    layer_id.clone(),
                    route,
                    self.config.clone(),
                ));
                *self.animation.lock() = Some(task);
            },
            Err(_) => self.view.set_route_reveal(&layer_id, 1.0, 1.0),
        }
        Some(layer_id)
    }

    /// Remove every route layer; safe to call repeatedly
    pub fn clear_routes(&self) {
        self.cancel_animation();
        let layers: Vec<String> = self.state.lock().route_layers.drain(..).collect();
        if !self.view.is_alive() {
            return;
        }
        for layer in layers {
            self.view.remove_route_layer(&layer);
        }
    }

    /// Whether a route animation task is still running
    pub fn is_animating(&self) -> bool {
        self.animation
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Cancel animations and remove everything this reconciler drew
    pub fn teardown(&self) {
        self.cancel_animation();
        let state = std::mem::take(&mut *self.state.lock());
        if !self.view.is_alive() {
            return;
        }
        for layer in &state.route_layers {
            self.view.remove_route_layer(layer);
        }
        for rendered in state.markers.values() {
            self.view.hide_popup(&rendered.handle);
            self.view.remove_marker(&rendered.handle);
        }
    }

    fn cancel_animation(&self) {
        if let Some(task) = self.animation.lock().take() {
            task.abort();
        }
    }
}

impl Drop for MapReconciler {
    fn drop(&mut self) {
        if let Some(task) = self.animation.get_mut().take() {
            task.abort();
        }
    }
}

#[allow(clippy::cast_precision_loss)]
async fn animate_route(
    view: Arc<dyn MapViewPort>,
    layer_id: String,
    route: Arc<Route>,
    config: ReconcilerConfig,
) {
    let frames = config.reveal_frames();
    let mut interval = tokio::time::interval(Duration::from_millis(config.frame_interval_ms));
    for frame in 1..=frames {
        interval.tick().await;
        if !view.is_alive() {
            return;
        }
        let progress = frame as f64 / frames as f64;
        view.set_route_reveal(&layer_id, progress, progress);
    }

    let step = Duration::from_millis(config.point_step_ms);
    for point in &route.geometry {
        tokio::time::sleep(step).await;
        if !view.is_alive() {
            return;
        }
        view.set_route_point(&layer_id, *point);
    }
    debug!(%layer_id, "Route animation finished");
}

fn marker_spec(result: &PlaceResult, index: usize, selected: bool) -> MarkerSpec {
    let position: LonLat = result.coordinates.to_lon_lat();
    MarkerSpec {
        id: result.id.clone(),
        position,
        label: (index + 1).to_string(),
        color: result.color_tag,
        selected,
        popup: popup_content(result),
    }
}

fn popup_content(result: &PlaceResult) -> PopupContent {
    PopupContent {
        title: result.name.clone(),
        address: result.address.clone(),
        distance: result.distance_meters.map(format_distance),
        duration: result.duration_seconds.map(format_duration),
        opening_hours: result.opening_hours.clone(),
        rating: result.rating.map(|r| format!("{r:.1}/5")),
    }
}

/// "850 m" below a kilometre, "1.2 km" above
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Whole minutes, with hours past the first hour
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as u64;
    if minutes < 1 {
        "< 1 min".to_string()
    } else if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}
