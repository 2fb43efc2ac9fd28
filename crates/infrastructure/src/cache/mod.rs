//! Cache implementations
//!
//! - `MokaCache`: bounded in-memory live layer with per-entry TTL
//! - `RedbCache`: embedded durable layer that keeps entries past their TTL
//! - `GeoCache`: both layers combined with write-through and promotion

mod geo_cache;
mod moka_cache;
mod redb_cache;

pub use geo_cache::GeoCache;
pub use moka_cache::{DEFAULT_MAX_ENTRIES, MokaCache};
pub use redb_cache::RedbCache;
