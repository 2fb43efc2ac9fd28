//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Latitude or longitude out of range
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Route query cannot be routed (too few distinct points)
    #[error("Invalid route query: {0}")]
    InvalidRouteQuery(String),

    /// Route has no steps to navigate
    #[error("Route has no steps")]
    EmptyRoute,

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create a route query error
    pub fn invalid_route_query(reason: impl Into<String>) -> Self {
        Self::InvalidRouteQuery(reason.into())
    }
}
