//! Common error type and result alias.
//!
//! Provider failures are split along the retry boundary: `RateLimited`,
//! `ProviderUnavailable` and `Timeout` are the normalized ends of the
//! adapter's retry loop, while `Provider` carries fatal provider responses
//! with the original message preserved for diagnostics.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// ContextPack invariant violation. Always fatal, never retried.
    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// Development-build guard assertion: a provider was invoked for a
    /// trace id that never went through context resolution.
    #[error("usage guard violation: {0}")]
    GuardViolation(String),

    /// Provider returned 429 and retries are exhausted.
    #[error("rate limited by {provider}, retry after {retry_after_seconds}s")]
    RateLimited {
        provider: String,
        retry_after_seconds: u64,
    },

    /// Transient provider failure that survived the retry budget.
    #[error("{provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// A single attempt exceeded its deadline and no retry remained.
    #[error("{provider} timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    /// Fatal provider response (bad credentials, non-retryable 4xx,
    /// malformed or missing payload).
    #[error("provider error: {0}")]
    Provider(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("image post-processing failed: {0}")]
    ImageProcessing(String),
}

impl AppError {
    /// Whether the adapter may spend a retry on this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::RateLimited { .. }
            | AppError::ProviderUnavailable { .. }
            | AppError::Timeout { .. } => true,
            AppError::HttpClient(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidContext(_) => StatusCode::BAD_REQUEST,
            AppError::GuardViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ProviderUnavailable { .. } | AppError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::RateLimited {
                provider,
                retry_after_seconds,
            } => json!({
                "code": "RATE_LIMITED",
                "provider": provider,
                "retryAfterSeconds": retry_after_seconds,
            }),
            AppError::ProviderUnavailable { provider, message } => json!({
                "code": "LLM_UNAVAILABLE",
                "provider": provider,
                "message": message,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
