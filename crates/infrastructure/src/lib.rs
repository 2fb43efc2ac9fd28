//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: the two-layer geo
//! cache, mapping API adapters, the WebSocket channel transport, plus
//! configuration loading, tracing setup and service wiring.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod services;
pub mod telemetry;

pub use adapters::*;
pub use cache::{GeoCache, MokaCache, RedbCache};
pub use config::{AppConfig, CacheConfig, GeoLocationConfig};
pub use services::CoreServices;
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryError, init_tracing};
