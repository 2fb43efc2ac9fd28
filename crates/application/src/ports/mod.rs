//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod cache_port;
mod channel_port;
mod clock;
mod directions_port;
mod geolocation_port;
mod map_view_port;
mod place_search_port;

pub use cache_port::{CachePort, CachePortExt, CacheStats, cache_key, namespace, ttl};
pub use channel_port::{ChannelConnection, ChannelFrame, ChannelTransport, FrameReceiver, FrameSender};
pub use clock::{Clock, ManualClock, SystemClock};
pub use directions_port::DirectionsPort;
#[cfg(test)]
pub use directions_port::MockDirectionsPort;
pub use geolocation_port::GeolocationPort;
#[cfg(test)]
pub use geolocation_port::MockGeolocationPort;
#[cfg(test)]
pub use map_view_port::MockMapViewPort;
pub use map_view_port::{MapViewPort, MarkerHandle, MarkerSpec, PopupContent};
#[cfg(test)]
pub use place_search_port::MockPlaceSearchPort;
pub use place_search_port::{PlaceSearchPort, PlaceSearchRequest};
