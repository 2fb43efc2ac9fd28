//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// External service error
    #[error("External service error: {0}")]
    ExternalService(String),

    /// External service did not answer in time
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ExternalService(_) | Self::Timeout(_)
        )
    }
}

/// Routing failures surfaced by `RouteProvider::try_route`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The directions backend errored or timed out
    #[error("Routing provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The backend answered with zero routes
    #[error("No route found")]
    NoRouteFound,

    /// Fewer than two distinct points
    #[error("Invalid route query: {0}")]
    InvalidQuery(String),
}

/// Why a single search provider attempt was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Search provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Search provider timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Search provider returned no results")]
    Empty,
}

/// Realtime channel failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Connection closed")]
    Closed,

    #[error("Reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Device position failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user refused location access; retrying will not help
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Position request timed out")]
    Timeout,
}

impl GeolocationError {
    /// Only a permission refusal is permanent
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}
