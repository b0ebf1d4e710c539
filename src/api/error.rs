use thiserror::Error;

use crate::models::UnknownPositionSide;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Invalid API response: {0}")]
    ParseError(String),

    #[error("Exchange API error: {code} - {message}")]
    ExchangeError { code: String, message: String },

    #[error("Clock skew of {skew_ms}ms rejected by exchange")]
    ClockSkew { skew_ms: i64 },

    #[error(transparent)]
    UnknownPositionSide(#[from] UnknownPositionSide),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ParseError(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ApiError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ApiError::TimeoutError(err.to_string())
    }
}
