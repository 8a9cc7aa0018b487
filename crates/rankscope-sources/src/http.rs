//! HTTP status and transport error mapping shared by the HTTP providers.

use crate::error::{Result, SourceError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Longest provider message kept in an error.
const MAX_DETAIL_CHARS: usize = 300;

/// Build the HTTP client used by the providers.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| SourceError::upstream(format!("failed to create HTTP client: {e}")))
}

/// Map a non-success status to a [`SourceError`].
#[must_use]
pub fn error_for_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> SourceError {
    let detail = truncate(body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::auth(if detail.is_empty() {
            status.to_string()
        } else {
            detail
        }),
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            SourceError::timeout(format!("HTTP {}", status.as_u16()))
        }
        _ => SourceError::UpstreamError {
            status: Some(status.as_u16()),
            detail,
        },
    }
}

/// Map a transport error to a [`SourceError`].
#[must_use]
pub fn error_for_transport(err: &reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::timeout(err.to_string())
    } else if err.is_decode() {
        SourceError::malformed(err.to_string())
    } else {
        SourceError::UpstreamError {
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }
}

/// `Retry-After` header in seconds, when present and numeric.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pass successful responses through and turn everything else into an error.
pub async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let hint = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(status, hint, &body))
}

/// Body of a successful response as text.
pub async fn read_text(response: Response) -> Result<String> {
    let response = check_response(response).await?;
    response.text().await.map_err(|e| error_for_transport(&e))
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_DETAIL_CHARS).collect()
}
