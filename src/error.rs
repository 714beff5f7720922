//! Failure classification shared by every external collaborator

use serde::{Deserialize, Serialize};

/// Why a collaborator call (LLM, search, participant) failed.
///
/// The loop only looks at [`ErrorKind::is_retryable`]; the rest is for
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, DNS, reset - retryable
    Network,
    /// Rate limited (429) - retryable with backoff
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Call did not finish within the configured deadline - retryable
    Timeout,
    /// Provider answered but produced nothing usable - retryable
    EmptyResponse,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Bad request (400, 404) - not retryable
    InvalidRequest,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::ServerError | Self::Timeout | Self::EmptyResponse
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            400 | 404 | 422 => Self::InvalidRequest,
            408 => Self::Timeout,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::EmptyResponse => "empty_response",
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a transport-level reqwest failure
pub fn classify_reqwest(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() || err.is_request() {
        ErrorKind::Network
    } else if let Some(status) = err.status() {
        ErrorKind::from_status(status.as_u16())
    } else {
        ErrorKind::Unknown
    }
}
