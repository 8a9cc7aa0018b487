//! Failures reported by language-model backends.

use thiserror::Error;

/// Why a completion did not produce a usable reply.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Non-success HTTP status not covered by a more specific variant
    #[error("{provider} returned HTTP {status}: {message}")]
    ApiError {
        /// Backend name
        provider: String,
        /// HTTP status
        status: u16,
        /// Response body
        message: String,
    },

    /// HTTP 429
    #[error("{provider} rate limited the request: {message}")]
    RateLimitExceeded {
        /// Backend name
        provider: String,
        /// `Retry-After` seconds, when sent
        retry_after_secs: Option<u64>,
        /// Response body
        message: String,
    },

    /// HTTP 401 or 403
    #[error("{provider} rejected the credentials: {message}")]
    AuthenticationFailed {
        /// Backend name
        provider: String,
        /// Response body
        message: String,
    },

    /// Reply arrived but could not be understood
    #[error("unreadable reply from {provider}: {message}")]
    ParseError {
        /// Backend name
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// Transport failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// No reply within the client timeout
    #[error("no reply within {seconds}s")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// HTTP client could not be constructed
    #[error("client setup failed: {0}")]
    Client(String),
}

/// Result alias for completions.
pub type Result<T> = std::result::Result<T, LlmError>;
