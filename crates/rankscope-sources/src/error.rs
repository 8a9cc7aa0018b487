//! Error taxonomy shared by every source adapter.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Failure of a single call to an external data source.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceError {
    /// The call did not finish in time
    #[error("source timed out: {detail}")]
    Timeout {
        /// What timed out
        detail: String,
    },

    /// The provider asked us to slow down
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Provider hint for the next attempt
        retry_after: Option<Duration>,
    },

    /// Credentials were missing or rejected
    #[error("authentication failed: {detail}")]
    AuthFailure {
        /// Provider message
        detail: String,
    },

    /// The provider failed or the request could not be served
    #[error("upstream error{}: {detail}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    UpstreamError {
        /// HTTP status, when there was a response
        status: Option<u16>,
        /// Provider message
        detail: String,
    },

    /// The provider answered with data that failed validation
    #[error("malformed response: {detail}")]
    MalformedResponse {
        /// What was wrong with the data
        detail: String,
    },

    /// The run was cancelled while the call was pending
    #[error("cancelled")]
    Cancelled,
}

impl SourceError {
    /// Timeout with a description.
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::Timeout {
            detail: detail.into(),
        }
    }

    /// Authentication failure with a description.
    pub fn auth(detail: impl Into<String>) -> Self {
        Self::AuthFailure {
            detail: detail.into(),
        }
    }

    /// Upstream failure without an HTTP status.
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::UpstreamError {
            status: None,
            detail: detail.into(),
        }
    }

    /// Validation failure with a description.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            detail: detail.into(),
        }
    }

    /// Whether the governor should try the call again.
    ///
    /// Rate limits, timeouts and 5xx upstream errors are transient; everything
    /// else (auth, validation, client errors, cancellation) is final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::UpstreamError {
                status: Some(status),
                ..
            } => (500..600).contains(status),
            Self::UpstreamError { status: None, .. }
            | Self::AuthFailure { .. }
            | Self::MalformedResponse { .. }
            | Self::Cancelled => false,
        }
    }

    /// Provider-suggested delay before the next attempt.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short, stable name of the error kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "Timeout",
            Self::RateLimited { .. } => "RateLimited",
            Self::AuthFailure { .. } => "AuthFailure",
            Self::UpstreamError { .. } => "UpstreamError",
            Self::MalformedResponse { .. } => "MalformedResponse",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl From<rankscope_llm::LlmError> for SourceError {
    fn from(err: rankscope_llm::LlmError) -> Self {
        use rankscope_llm::LlmError;
        match err {
            LlmError::AuthenticationFailed { message, .. } => Self::auth(message),
            LlmError::RateLimitExceeded {
                retry_after_secs, ..
            } => Self::RateLimited {
                retry_after: retry_after_secs.map(Duration::from_secs),
            },
            LlmError::Timeout { seconds } => {
                Self::timeout(format!("language model did not answer within {seconds}s"))
            }
            LlmError::ApiError {
                status, message, ..
            } => Self::UpstreamError {
                status: Some(status),
                detail: message,
            },
            LlmError::ParseError { message, .. } => Self::malformed(message),
            LlmError::Network(e) if e.is_timeout() => Self::timeout(e.to_string()),
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<rankscope_browser::BrowserError> for SourceError {
    fn from(err: rankscope_browser::BrowserError) -> Self {
        use rankscope_browser::BrowserError;
        match err {
            BrowserError::Timeout(detail) | BrowserError::MissingElement(detail) => {
                Self::timeout(detail)
            }
            BrowserError::ReportParse(detail) => Self::malformed(detail),
            BrowserError::Cdp(detail) | BrowserError::Navigation(detail) => {
                Self::UpstreamError {
                    status: Some(502),
                    detail,
                }
            }
        }
    }
}
