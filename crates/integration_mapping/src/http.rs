//! Shared HTTP plumbing for the mapping clients

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::MappingConfig;
use crate::error::MappingError;

/// GET-and-decode helper with uniform error mapping
#[derive(Debug)]
pub(crate) struct HttpCore {
    client: Client,
    access_token: Option<SecretString>,
    timeout_secs: u64,
}

impl HttpCore {
    pub(crate) fn new(config: &MappingConfig) -> Result<Self, MappingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Wayfinder/1.0")
            .build()
            .map_err(|e| MappingError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            access_token: config.access_token.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, MappingError> {
        let mut request = self.client.get(url).query(params);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token.expose_secret())]);
        }

        debug!(%url, "Mapping request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MappingError::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                MappingError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MappingError::RateLimitExceeded {
                retry_after_secs: response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            });
        }

        if !status.is_success() {
            return Err(MappingError::RequestFailed(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MappingError::ParseError(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| MappingError::ParseError(e.to_string()))
    }
}
