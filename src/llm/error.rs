//! LLM error types

use crate::error::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: ErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn empty_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyResponse, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Build an error from a non-success HTTP status and the provider's message
    pub fn from_status(status: u16, message: &str) -> Self {
        let kind = ErrorKind::from_status(status);
        let prefix = match kind {
            ErrorKind::Auth => "Authentication failed",
            ErrorKind::RateLimit => "Rate limit exceeded",
            ErrorKind::InvalidRequest => "Invalid request",
            ErrorKind::ServerError => "Server error",
            ErrorKind::Timeout => "Request timeout",
            _ => return Self::new(kind, format!("HTTP {status}: {message}")),
        };
        Self::new(kind, format!("{prefix}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_provider_message() {
        let err = LlmError::from_status(401, "bad key");
        assert_eq!(err.kind, ErrorKind::Auth);
        assert_eq!(err.message, "Authentication failed: bad key");

        let err = LlmError::from_status(418, "teapot");
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "HTTP 418: teapot");
    }

    #[test]
    fn test_retry_after_builder() {
        let err = LlmError::rate_limit("slow down").with_retry_after(Duration::from_secs(3));
        assert!(err.kind.is_retryable());
        assert_eq!(err.retry_after, Some(Duration::from_secs(3)));
    }
}
