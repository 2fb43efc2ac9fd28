//! Turn-by-turn navigation session
//!
//! Simulated progress along a route: `tick` turns elapsed clock time into
//! step and percentage progress. `NavigationTicker` calls it on an interval.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::{
    DistanceEstimator, GeoLocation, NavigationState, NavigationStatus, Route, RouteQuery,
    TransportMode,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::route_provider::RouteProvider;
use crate::error::RoutingError;
use crate::ports::Clock;

/// Navigation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Ticker period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated seconds per wall-clock second
    #[serde(default = "default_simulation_speed")]
    pub simulation_speed: f64,

    /// Whether a new session starts with the camera following
    #[serde(default = "default_follow")]
    pub follow_by_default: bool,
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_simulation_speed() -> f64 {
    1.0
}

const fn default_follow() -> bool {
    true
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            simulation_speed: default_simulation_speed(),
            follow_by_default: default_follow(),
        }
    }
}

impl NavigationConfig {
    /// Fast ticks for tests
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            tick_interval_ms: 100,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be greater than 0".to_string());
        }
        if !self.simulation_speed.is_finite() || self.simulation_speed <= 0.0 {
            return Err("simulation_speed must be a positive number".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Step start and end in simulated seconds
#[derive(Debug, Clone, Copy)]
struct StepSpan {
    start: f64,
    end: f64,
}

#[derive(Debug, Default)]
struct Progress {
    state: NavigationState,
    spans: Vec<StepSpan>,
    elapsed: f64,
    last_tick: Option<DateTime<Utc>>,
}

impl Progress {
    fn total(&self) -> f64 {
        self.spans.last().map_or(0.0, |s| s.end)
    }

    fn last_index(&self) -> usize {
        self.spans.len().saturating_sub(1)
    }

    #[allow(clippy::cast_precision_loss)]
    fn refresh_percent(&mut self) {
        let total = self.total();
        self.state.progress_percent = if total > 0.0 {
            (self.elapsed / total * 100.0).clamp(0.0, 100.0)
        } else if self.last_index() == 0 {
            0.0
        } else {
            (self.state.current_step_index as f64 / self.last_index() as f64 * 100.0)
                .clamp(0.0, 100.0)
        };
    }

    fn enter_step(&mut self, index: usize) {
        self.state.current_step_index = index;
        self.settle();
    }

    /// Refresh the percentage; a final step with nothing left completes
    fn settle(&mut self) {
        self.refresh_percent();
        let last = self.last_index();
        let finished = self.spans.get(last).is_some_and(|s| self.elapsed >= s.end)
            || self.state.progress_percent >= 100.0;
        if self.state.current_step_index == last && finished {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.state.current_step_index = self.last_index();
        self.elapsed = self.total();
        self.state.progress_percent = 100.0;
        self.state.status = NavigationStatus::Completed;
    }
}

/// Navigation over a single route at a time
pub struct NavigationSession {
    routes: Arc<RouteProvider>,
    clock: Arc<dyn Clock>,
    config: NavigationConfig,
    progress: Mutex<Progress>,
    updates: watch::Sender<NavigationState>,
    ticker: Mutex<Option<NavigationTicker>>,
}

impl std::fmt::Debug for NavigationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSession")
            .field("state", &self.progress.lock().state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NavigationSession {
    pub fn new(routes: Arc<RouteProvider>, clock: Arc<dyn Clock>, config: NavigationConfig) -> Self {
        let (updates, _) = watch::channel(NavigationState::default());
        Self {
            routes,
            clock,
            config,
            progress: Mutex::new(Progress::default()),
            updates,
            ticker: Mutex::new(None),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> NavigationState {
        self.progress.lock().state.clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<NavigationState> {
        self.updates.subscribe()
    }

    fn publish(&self, state: &NavigationState) {
        self.updates.send_replace(state.clone());
    }

    fn set_status(&self, status: NavigationStatus) -> NavigationState {
        let state = {
            let mut progress = self.progress.lock();
            let is_following = progress.state.is_following;
            *progress = Progress::default();
            progress.state.status = status;
            progress.state.is_following = is_following;
            progress.state.clone()
        };
        self.publish(&state);
        state
    }

    /// Load a route and start navigating it
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the session `Failed` when no usable route
    /// could be loaded. A new `start` is allowed afterwards.
    #[instrument(skip(self))]
    pub async fn start(
        &self,
        origin: GeoLocation,
        destination: GeoLocation,
        mode: TransportMode,
    ) -> Result<NavigationState, RoutingError> {
        self.set_status(NavigationStatus::Loading);

        let query = RouteQuery::new(origin, destination, mode);
        if let Err(e) = query.validate() {
            warn!(error = %e, "Cannot navigate");
            self.set_status(NavigationStatus::Failed);
            return Err(RoutingError::InvalidQuery(e.to_string()));
        }

        let route = self.routes.route(&query).await;
        self.start_with_route(route)
    }

    /// Start navigating an already computed route
    ///
    /// # Errors
    ///
    /// Returns `NoRouteFound` for a route without steps.
    pub fn start_with_route(&self, route: Arc<Route>) -> Result<NavigationState, RoutingError> {
        if route.legs.is_empty() {
            warn!("Route has no steps");
            self.set_status(NavigationStatus::Failed);
            return Err(RoutingError::NoRouteFound);
        }

        let now = self.clock.now();
        let state = {
            let mut progress = self.progress.lock();
            let is_following = if progress.state.route.is_some() {
                progress.state.is_following
            } else {
                self.config.follow_by_default
            };
            *progress = Progress {
                spans: step_spans(&route),
                state: NavigationState {
                    route: Some(route),
                    current_step_index: 0,
                    progress_percent: 0.0,
                    is_following,
                    status: NavigationStatus::Active,
                },
                elapsed: 0.0,
                last_tick: Some(now),
            };
            progress.state.clone()
        };
        info!(steps = state.route.as_ref().map_or(0, |r| r.legs.len()), "Navigation started");
        self.publish(&state);
        Ok(state)
    }

    /// Advance simulated progress by the time passed since the last tick
    ///
    /// Moves at most one step per call and never skips a step.
    pub fn tick(&self) -> NavigationState {
        let now = self.clock.now();
        let state = {
            let mut progress = self.progress.lock();
            if progress.state.status != NavigationStatus::Active {
                return progress.state.clone();
            }

            let delta = progress.last_tick.map_or(0.0, |last| seconds_between(last, now));
            progress.last_tick = Some(now);
            let delta = delta * self.config.simulation_speed;

            let index = progress.state.current_step_index;
            let last = progress.last_index();

            if progress.total() <= 0.0 {
                // Without durations every tick consumes one step
                if index >= last {
                    progress.complete();
                } else {
                    progress.enter_step(index + 1);
                }
            } else {
                let step_end = progress.spans[index].end;
                progress.elapsed = (progress.elapsed + delta).min(step_end);
                if progress.elapsed >= step_end {
                    if index >= last {
                        progress.complete();
                    } else {
                        progress.enter_step(index + 1);
                    }
                } else {
                    progress.settle();
                }
            }
            progress.state.clone()
        };

        if state.status == NavigationStatus::Completed {
            info!("Navigation completed");
        }
        self.publish(&state);
        state
    }

    /// Flip camera following; progress is unaffected
    pub fn toggle_follow(&self) -> bool {
        let state = {
            let mut progress = self.progress.lock();
            progress.state.is_following = !progress.state.is_following;
            progress.state.clone()
        };
        self.publish(&state);
        state.is_following
    }

    /// Jump to a step, clamped to the route
    ///
    /// This is the only way to move backwards. A completed session becomes
    /// active again unless the target is a final step without duration.
    pub fn set_current_step(&self, index: usize) -> NavigationState {
        let now = self.clock.now();
        let state = {
            let mut progress = self.progress.lock();
            if progress.state.route.is_none() {
                return progress.state.clone();
            }
            let index = index.min(progress.last_index());
            progress.elapsed = progress.spans[index].start;
            progress.last_tick = Some(now);
            progress.state.status = NavigationStatus::Active;
            progress.enter_step(index);
            progress.state.clone()
        };
        debug!(step = state.current_step_index, "Navigation step set");
        self.publish(&state);
        state
    }

    /// End the session and cancel its ticker
    pub fn stop(&self) -> NavigationState {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop();
        }
        self.set_status(NavigationStatus::Idle)
    }

    /// Start a ticker owned by this session, replacing any previous one
    pub fn start_ticker(self: &Arc<Self>) {
        let ticker = NavigationTicker::spawn(self);
        if let Some(previous) = self.ticker.lock().replace(ticker) {
            previous.stop();
        }
    }

    /// Whether the owned ticker is running
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(NavigationTicker::is_running)
    }

    /// Distance still ahead, counting the unfinished part of the current step
    pub fn remaining_distance_meters(&self) -> f64 {
        let progress = self.progress.lock();
        let Some(route) = progress.state.route.as_ref() else {
            return 0.0;
        };
        if progress.state.status == NavigationStatus::Completed {
            return 0.0;
        }
        let index = progress.state.current_step_index;
        let Some(current) = route.legs.get(index) else {
            return 0.0;
        };

        let span = progress.spans[index];
        let left_fraction = if span.end > span.start {
            ((span.end - progress.elapsed) / (span.end - span.start)).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let ahead: f64 = route.legs[index + 1..]
            .iter()
            .map(|s| DistanceEstimator::sanitize(s.distance_meters))
            .sum();
        DistanceEstimator::sanitize(current.distance_meters) * left_fraction + ahead
    }

    /// Simulated seconds still ahead
    pub fn remaining_duration_seconds(&self) -> f64 {
        let progress = self.progress.lock();
        if progress.state.route.is_none() {
            return 0.0;
        }
        (progress.total() - progress.elapsed).max(0.0)
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.stop();
        }
    }
}

fn step_spans(route: &Route) -> Vec<StepSpan> {
    let durations: Vec<f64> = route
        .legs
        .iter()
        .map(|s| DistanceEstimator::sanitize(s.duration_seconds))
        .collect();
    let step_total: f64 = durations.iter().sum();
    let route_total = DistanceEstimator::sanitize(route.duration_seconds);

    #[allow(clippy::cast_precision_loss)]
    let even = route_total / route.legs.len().max(1) as f64;

    let mut start = 0.0;
    durations
        .into_iter()
        .map(|d| {
            let d = if step_total > 0.0 { d } else { even };
            let span = StepSpan {
                start,
                end: start + d,
            };
            start += d;
            span
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds().max(0) as f64 / 1000.0
}

/// Drives `NavigationSession::tick` on a Tokio interval
///
/// Holds only a weak reference, so the task ends once the session is dropped
/// or stops being active. Dropping the ticker aborts it.
#[derive(Debug)]
pub struct NavigationTicker {
    task: JoinHandle<()>,
}

impl NavigationTicker {
    pub fn spawn(session: &Arc<NavigationSession>) -> Self {
        let weak: Weak<NavigationSession> = Arc::downgrade(session);
        let period = session.config.tick_interval();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(session) = weak.upgrade() else {
                    break;
                };
                if session.tick().status != NavigationStatus::Active {
                    debug!("Navigation ticker finished");
                    break;
                }
            }
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for NavigationTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
