//! Mapping error types

use domain::TransportMode;
use thiserror::Error;

/// Errors that can occur when talking to mapping backends
#[derive(Debug, Error)]
pub enum MappingError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Backend answered with an error status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying (if provided by the backend)
        retry_after_secs: Option<u64>,
    },

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// The request was rejected before it was sent
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The directions backend has no profile for this mode
    #[error("No directions profile for {0}")]
    UnsupportedMode(TransportMode),
}

impl MappingError {
    /// Returns true if this error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::RequestFailed(_)
                | Self::Timeout { .. }
                | Self::RateLimitExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(MappingError::ConnectionFailed("refused".to_string()).is_retryable());
        assert!(MappingError::RequestFailed("HTTP 503".to_string()).is_retryable());
        assert!(MappingError::Timeout { timeout_secs: 5 }.is_retryable());
        assert!(
            MappingError::RateLimitExceeded {
                retry_after_secs: Some(30)
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!MappingError::ParseError("bad json".to_string()).is_retryable());
        assert!(!MappingError::InvalidQuery("empty".to_string()).is_retryable());
        assert!(!MappingError::UnsupportedMode(TransportMode::Transit).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = MappingError::UnsupportedMode(TransportMode::Transit);
        assert!(err.to_string().contains("transit"));

        let err = MappingError::RateLimitExceeded {
            retry_after_secs: Some(60),
        };
        assert!(err.to_string().contains("60"));
    }
}
