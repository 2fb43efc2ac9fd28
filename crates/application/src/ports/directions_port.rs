//! Directions service port

use async_trait::async_trait;
use domain::{Route, RouteQuery};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for turn-by-turn directions backends
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DirectionsPort: Send + Sync {
    /// Every alternative route the backend offers, best first
    ///
    /// Returns an empty list when the backend found no route.
    async fn directions(&self, query: &RouteQuery) -> Result<Vec<Route>, ApplicationError>;
}
