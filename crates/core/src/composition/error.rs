//! Error types for the composition module.

use thiserror::Error;

/// Errors that can occur while composing.
///
/// Only [`CompositionError::Cancelled`] ever escapes
/// [`CompositionClient::compose`](super::CompositionClient::compose); every
/// other variant is absorbed into the fallback path.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// Missing credential or endpoint.
    #[error("composition service not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Failed to parse a response.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// I/O error reading inputs or writing the result.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The job reached the failed terminal state.
    #[error("composition job {job_id} failed: {reason}")]
    Failed { job_id: String, reason: String },

    /// The job did not reach a terminal state within the attempt ceiling.
    #[error("composition job {job_id} still pending after {attempts} attempts")]
    Timeout { job_id: String, attempts: u32 },

    /// The pipeline was cancelled while waiting.
    #[error("composition cancelled")]
    Cancelled,
}

impl CompositionError {
    /// Whether a status poll that hit this error may simply be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Http(_) => "http",
            Self::Api { .. } => "api",
            Self::RateLimited => "rate_limited",
            Self::Parse(_) => "parse",
            Self::Io(_) => "io",
            Self::Failed { .. } => "failed",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(CompositionError::RateLimited.is_retryable());
        assert!(CompositionError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!CompositionError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!CompositionError::Cancelled.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = CompositionError::Timeout {
            job_id: "job-1".to_string(),
            attempts: 30,
        };
        assert_eq!(
            err.to_string(),
            "composition job job-1 still pending after 30 attempts"
        );
        assert_eq!(err.kind(), "timeout");
    }
}
