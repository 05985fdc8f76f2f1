//! Error types for the external solver path.

use std::time::Duration;

use thiserror::Error;

/// Failures raised by a solver adapter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterError {
    /// The solve did not finish within its time bound.
    #[error("solver timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service reported the job as failed.
    #[error("solver job failed: {0}")]
    JobFailed(String),

    /// The payload could not be understood.
    #[error("invalid solver response: {0}")]
    InvalidResponse(String),

    /// The solver finished without returning any sample.
    #[error("solver returned no samples")]
    EmptyResult,
}

impl AdapterError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// True for failures that may succeed on a later call.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest does not report the elapsed bound.
        if err.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Failures surfaced by the external solver client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExternalSolveError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Trial mode refuses problems above the configured candidate ceiling.
    #[error("{count} candidates exceed the external limit of {limit}")]
    CandidateLimitExceeded { count: usize, limit: usize },
}

impl ExternalSolveError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Adapter(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_distinguishable() {
        let err = ExternalSolveError::from(AdapterError::Timeout(Duration::from_secs(10)));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
        assert!(!ExternalSolveError::from(AdapterError::EmptyResult).is_timeout());
    }

    #[test]
    fn transient_classification() {
        assert!(AdapterError::Network("reset".into()).is_transient());
        assert!(AdapterError::api(503, "busy").is_transient());
        assert!(AdapterError::api(429, "slow down").is_transient());
        assert!(!AdapterError::api(401, "bad token").is_transient());
        assert!(!AdapterError::JobFailed("diverged".into()).is_transient());
    }

    #[test]
    fn limit_message_has_counts() {
        let err = ExternalSolveError::CandidateLimitExceeded { count: 80, limit: 60 };
        let msg = err.to_string();
        assert!(msg.contains("80"));
        assert!(msg.contains("60"));
    }
}
