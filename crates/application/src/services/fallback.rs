//! Ordered provider fallback
//!
//! Tries providers one after another, each under its own timeout, and stops
//! at the first answer the caller accepts. Failures are collected so the
//! caller can log which providers were skipped and why.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{ApplicationError, SearchError};

/// A provider that was tried and rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Position of the provider in the list
    pub index: usize,
    pub error: SearchError,
}

/// Result of walking a provider list
#[derive(Debug)]
pub struct Fallback<T> {
    /// Index of the provider that answered, with its answer
    pub success: Option<(usize, T)>,
    pub failures: Vec<AttemptFailure>,
}

impl<T> Fallback<T> {
    /// True when every provider failed
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.success.is_none()
    }
}

/// Return the first accepted answer from an ordered provider list
///
/// An attempt fails when it errors, exceeds `timeout`, or returns a value
/// `accept` rejects (typically an empty list). Providers after the first
/// success are never called.
pub async fn first_success<P, T, F, Fut, A>(
    providers: &[P],
    timeout: Duration,
    accept: A,
    mut attempt: F,
) -> Fallback<T>
where
    F: FnMut(&P) -> Fut,
    Fut: Future<Output = Result<T, ApplicationError>>,
    A: Fn(&T) -> bool,
{
    let mut failures = Vec::new();

    for (index, provider) in providers.iter().enumerate() {
        let error = match tokio::time::timeout(timeout, attempt(provider)).await {
            Ok(Ok(value)) if accept(&value) => {
                return Fallback {
                    success: Some((index, value)),
                    failures,
                };
            },
            Ok(Ok(_)) => SearchError::Empty,
            Ok(Err(e)) => SearchError::ProviderUnavailable(e.to_string()),
            Err(_) => SearchError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
        };
        debug!(index, %error, "Provider attempt rejected");
        failures.push(AttemptFailure { index, error });
    }

    Fallback {
        success: None,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Behaviour {
        Answer(usize),
        Fail,
        Hang,
    }

    const TIMEOUT: Duration = Duration::from_secs(3);

    #[allow(clippy::ptr_arg)]
    fn non_empty(values: &Vec<u32>) -> bool {
        !values.is_empty()
    }

    async fn run(behaviour: Behaviour) -> Result<Vec<u32>, ApplicationError> {
        match behaviour {
            Behaviour::Answer(n) => Ok((0..u32::try_from(n).unwrap()).collect()),
            Behaviour::Fail => Err(ApplicationError::ExternalService("down".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![1])
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_provider_wins() {
        let providers = [Behaviour::Answer(2), Behaviour::Answer(5)];
        let result = first_success(&providers, TIMEOUT, non_empty, |b| run(*b)).await;
        let (index, value) = result.success.unwrap();
        assert_eq!(index, 0);
        assert_eq!(value.len(), 2);
        assert!(result.failures.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn skips_error_timeout_and_empty() {
        let providers = [
            Behaviour::Fail,
            Behaviour::Hang,
            Behaviour::Answer(0),
            Behaviour::Answer(3),
        ];
        let result = first_success(&providers, TIMEOUT, non_empty, |b| run(*b)).await;
        assert_eq!(result.success.as_ref().map(|(i, _)| *i), Some(3));
        assert_eq!(result.failures.len(), 3);
        assert!(matches!(result.failures[0].error, SearchError::ProviderUnavailable(_)));
        assert_eq!(
            result.failures[1].error,
            SearchError::Timeout { timeout_ms: 3000 }
        );
        assert_eq!(result.failures[2].error, SearchError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_when_all_fail() {
        let providers = [Behaviour::Fail, Behaviour::Answer(0)];
        let result = first_success(&providers, TIMEOUT, non_empty, |b| run(*b)).await;
        assert!(result.exhausted());
        assert_eq!(result.failures.len(), 2);
    }

    #[tokio::test]
    async fn empty_provider_list_is_exhausted() {
        let providers: [Behaviour; 0] = [];
        let result = first_success(&providers, TIMEOUT, non_empty, |b| run(*b)).await;
        assert!(result.exhausted());
        assert!(result.failures.is_empty());
    }
}
