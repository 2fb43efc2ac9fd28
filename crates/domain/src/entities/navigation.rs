//! Navigation state

use std::sync::Arc;

use serde::Serialize;

use super::route::{Route, Step};

/// Lifecycle of a navigation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavigationStatus {
    #[default]
    Idle,
    Loading,
    Active,
    Completed,
    Failed,
}

/// Snapshot of a navigation session
///
/// `current_step_index` never decreases under ticks and `progress_percent`
/// stays within `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationState {
    pub route: Option<Arc<Route>>,
    pub current_step_index: usize,
    pub progress_percent: f64,
    pub is_following: bool,
    pub status: NavigationStatus,
}

impl NavigationState {
    /// Step currently being followed
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.route
            .as_ref()
            .and_then(|r| r.legs.get(self.current_step_index))
    }

    /// Whether the final step has been fully consumed
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.route.as_ref().is_some_and(|r| {
            self.current_step_index == r.last_step_index() && self.progress_percent >= 100.0
        })
    }
}
