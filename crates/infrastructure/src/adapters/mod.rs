//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod directions_adapter;
mod geocoding_adapter;
mod geolocation_adapter;
mod place_search_adapter;
mod websocket_transport;

use application::error::ApplicationError;
use integration_mapping::MappingError;

pub use directions_adapter::DirectionsAdapter;
pub use geocoding_adapter::GeocodingAdapter;
pub use geolocation_adapter::ConfiguredGeolocation;
pub use place_search_adapter::PlaceSearchAdapter;
pub use websocket_transport::WebSocketTransport;

/// Map a mapping backend error to an application error
///
/// Everything the backend itself got wrong stays retryable so the callers'
/// fallback chains move on to the next source.
fn map_mapping_error(err: MappingError) -> ApplicationError {
    match err {
        MappingError::ConnectionFailed(e)
        | MappingError::RequestFailed(e)
        | MappingError::ParseError(e)
        | MappingError::InvalidQuery(e) => ApplicationError::ExternalService(e),
        MappingError::RateLimitExceeded { .. } => ApplicationError::RateLimited,
        MappingError::Timeout { timeout_secs } => {
            ApplicationError::Timeout(timeout_secs.saturating_mul(1000))
        },
        e @ MappingError::UnsupportedMode(_) => ApplicationError::ExternalService(e.to_string()),
    }
}
