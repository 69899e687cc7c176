//! API error type and the JSON error envelope.
//!
//! Every route answers failures as `{"status": "error", "error": "<message>"}`.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::providers::UpstreamError;
use crate::resilience::QueueError;

pub type ApiResult<T> = Result<T, ApiError>;

/// A failed API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Rate limit exceeded, retry in {}s", .retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Queue(QueueError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Queue(QueueError::Dropped { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Queue(QueueError::Upstream(e)) => upstream_status(e),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        Self::Queue(QueueError::Upstream(err))
    }
}

fn upstream_status(err: &UpstreamError) -> StatusCode {
    if err.is_rate_limited() {
        return StatusCode::TOO_MANY_REQUESTS;
    }
    match err {
        UpstreamError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        UpstreamError::Transport { source, .. } if source.is_timeout() => {
            StatusCode::GATEWAY_TIMEOUT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
        }

        let mut response = (status, Json(json!({"status": "error", "error": message}))).into_response();
        if let Self::RateLimited { retry_after } = self {
            let secs = retry_after.as_secs().max(1).to_string();
            if let Ok(value) = HeaderValue::from_str(&secs) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(UpstreamError::Status {
                provider: "fal",
                status: 429,
                body: String::new()
            })
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(UpstreamError::Timeout {
                provider: "fal",
                waited_secs: 300
            })
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(QueueError::Timeout {
                queue: "fal",
                waited_ms: 1
            })
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(UpstreamError::MissingCredentials { provider: "openai" }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(300)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
