//! HTTP plumbing shared by the backends.

use crate::error::{LlmError, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// HTTP client with a request timeout (60 s when `None`).
pub fn build_http_client(timeout_secs: Option<u64>) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.unwrap_or(60)))
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))
}

/// Turn a non-success HTTP response into the matching [`LlmError`].
///
/// 401/403 become authentication failures and 429 a rate limit carrying the
/// `Retry-After` seconds when present.
pub async fn error_for_status(provider: &str, response: Response) -> LlmError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthenticationFailed {
            provider: provider.to_string(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded {
            provider: provider.to_string(),
            retry_after_secs,
            message,
        },
        _ => LlmError::ApiError {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        },
    }
}
