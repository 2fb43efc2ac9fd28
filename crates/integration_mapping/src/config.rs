//! Mapping service configuration

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for the place search, geocoding and directions backends
#[derive(Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Base URL of the primary place search service
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Base URL of the geocoding service
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,

    /// Base URL of the directions service
    #[serde(default = "default_directions_base_url")]
    pub directions_base_url: String,

    /// Access token sent as `access_token` query parameter (sensitive)
    #[serde(default, skip_serializing)]
    pub access_token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Language for instructions and place names
    #[serde(default = "default_language")]
    pub language: String,

    /// Maximum results requested from search backends
    #[serde(default = "default_max_results")]
    pub max_results: u8,
}

impl std::fmt::Debug for MappingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingConfig")
            .field("search_base_url", &self.search_base_url)
            .field("geocoding_base_url", &self.geocoding_base_url)
            .field("directions_base_url", &self.directions_base_url)
            .field(
                "access_token",
                &if self.access_token.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("language", &self.language)
            .field("max_results", &self.max_results)
            .finish()
    }
}

fn default_search_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_geocoding_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_directions_base_url() -> String {
    "http://localhost:5000".to_string()
}

const fn default_timeout_secs() -> u64 {
    5
}

fn default_language() -> String {
    "en".to_string()
}

const fn default_max_results() -> u8 {
    10
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            search_base_url: default_search_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
            directions_base_url: default_directions_base_url(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
            language: default_language(),
            max_results: default_max_results(),
        }
    }
}

impl MappingConfig {
    /// Create a configuration pointing every backend at one base URL
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            search_base_url: base_url.to_string(),
            geocoding_base_url: base_url.to_string(),
            directions_base_url: base_url.to_string(),
            timeout_secs: 2,
            ..Default::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("search_base_url", &self.search_base_url),
            ("geocoding_base_url", &self.geocoding_base_url),
            ("directions_base_url", &self.directions_base_url),
        ] {
            Url::parse(value).map_err(|e| format!("{name} is not a valid URL: {e}"))?;
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.max_results == 0 {
            return Err("max_results must be greater than 0".to_string());
        }

        Ok(())
    }
}
