use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;

use super::error::ApiError;
use super::retry::AttemptOutcome;
use super::wire::truncate_body;

/// Longest body excerpt carried in errors and log lines
pub const MAX_LOGGED_BODY: usize = 2048;

const MAX_RETRY_AFTER_SECS: f64 = 3600.0;

/// A completed HTTP exchange with its body read
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Why a send did not produce a usable response
#[derive(Debug)]
pub enum SendFailure {
    RateLimited(Option<Duration>),
    Transient(ApiError),
    Fatal(ApiError),
}

impl<T> From<SendFailure> for AttemptOutcome<T> {
    fn from(failure: SendFailure) -> Self {
        match failure {
            SendFailure::RateLimited(retry_after) => AttemptOutcome::RateLimited { retry_after },
            SendFailure::Transient(e) => AttemptOutcome::Retryable(e),
            SendFailure::Fatal(e) => AttemptOutcome::Fatal(e),
        }
    }
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ApiError::from)
}

/// Send a request and read its body. Network errors are transient; 429 is
/// reported with its Retry-After hint. Other statuses are left to the caller.
pub async fn send(request: RequestBuilder) -> Result<RawResponse, SendFailure> {
    let response = request
        .send()
        .await
        .map_err(|e| SendFailure::Transient(ApiError::HttpError(e)))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SendFailure::RateLimited(retry_after_hint(response.headers())));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SendFailure::Transient(ApiError::HttpError(e)))?;

    Ok(RawResponse { status, body })
}

/// 2xx passes; 401/403 are fatal; every other status is retryable.
pub fn check_status(raw: &RawResponse) -> Result<(), SendFailure> {
    if raw.status.is_success() {
        return Ok(());
    }

    if raw.status == StatusCode::UNAUTHORIZED || raw.status == StatusCode::FORBIDDEN {
        return Err(SendFailure::Fatal(ApiError::AuthenticationError(format!(
            "HTTP {}: {}",
            raw.status.as_u16(),
            truncate_body(&raw.body, MAX_LOGGED_BODY)
        ))));
    }

    Err(SendFailure::Transient(ApiError::HttpStatus {
        status: raw.status.as_u16(),
        body: truncate_body(&raw.body, MAX_LOGGED_BODY),
    }))
}

/// Retry-After in delta-seconds form (HTTP-date values are ignored)
pub fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER_SECS)))
}

/// Join `key=value` pairs with `&`, in the given order, without extra encoding
pub fn join_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}
