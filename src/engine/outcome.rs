use crate::state::FetchStatus;
use std::time::Duration;

/// What happened to one fetch request
///
/// `payload` is present exactly when the status is `ServedFromCache` or
/// `Fetched`. `error` carries the failure text for `Error`, and `reason`
/// says why a `BlockedByPolicy` request was refused.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub url: String,
    pub status: FetchStatus,
    pub payload: Option<T>,
    pub error: Option<String>,
    pub reason: Option<String>,
    /// Time spent held back by pacing
    pub waited: Duration,
    /// Time from the call to the decision
    pub elapsed: Duration,
}

impl<T> FetchOutcome<T> {
    pub(crate) fn new(url: &str, status: FetchStatus) -> Self {
        Self {
            url: url.to_string(),
            status,
            payload: None,
            error: None,
            reason: None,
            waited: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn cached(url: &str, payload: T) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new(url, FetchStatus::ServedFromCache)
        }
    }

    pub(crate) fn fetched(url: &str, payload: T) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new(url, FetchStatus::Fetched)
        }
    }

    pub(crate) fn blocked(url: &str, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(url, FetchStatus::BlockedByPolicy)
        }
    }

    pub(crate) fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(url, FetchStatus::Error)
        }
    }

    pub(crate) fn with_timing(mut self, waited: Duration, elapsed: Duration) -> Self {
        self.waited = waited;
        self.elapsed = elapsed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_blocked(&self) -> bool {
        self.status == FetchStatus::BlockedByPolicy
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }

    /// Takes the payload, discarding the metadata
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }
}
