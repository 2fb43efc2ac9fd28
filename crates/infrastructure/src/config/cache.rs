//! Cache configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_MAX_ENTRIES;

/// Geo cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in the live (in-memory) layer
    #[serde(default = "default_max_live_entries")]
    pub max_live_entries: u64,

    /// Redb file of the durable layer; an in-memory store is used when unset
    #[serde(default)]
    pub durable_path: Option<PathBuf>,

    /// Durable entries older than this are pruned at startup (default: 7 days)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

const fn default_max_live_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

const fn default_retention_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_live_entries: default_max_live_entries(),
            durable_path: None,
            retention_secs: default_retention_secs(),
        }
    }
}

impl CacheConfig {
    /// In-memory durable layer and a small live layer
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_live_entries: 100,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_live_entries == 0 {
            return Err("max_live_entries must be greater than 0".to_string());
        }
        if self.retention_secs == 0 {
            return Err("retention_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
