//! Application layer - Use cases and orchestration
//!
//! Contains the search, routing, realtime, map reconciliation and navigation
//! services together with the port traits they depend on. Adapters in the
//! infrastructure layer implement the ports.

pub mod error;
pub mod ports;
pub mod services;

pub use error::{ApplicationError, ChannelError, GeolocationError, RoutingError, SearchError};
pub use ports::*;
pub use services::*;
