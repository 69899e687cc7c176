//! Request handling: IDs, metrics, body extraction and caller identity.
//!
//! # Responsibilities
//! - Assign every request an `x-request-id` (UUID v4) and echo it back
//! - Record per-route request metrics
//! - Accept the same payload as JSON or as multipart form data
//! - Extract the caller's identity from `x-user-id`

use std::time::{Duration, Instant};

use axum::extract::{FromRequest, FromRequestParts, MatchedPath, Multipart, Query, Request, State};
use axum::http::{header, request::Parts, HeaderName};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::observability::metrics;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Identity header set by the authenticating front end.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Record request count and latency under the matched route template.
pub async fn record_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(route, response.status().as_u16(), start);
    response
}

/// Answer 504 with the error envelope once `limit` has passed.
///
/// The handler future is dropped; a queued provider call already in flight
/// finishes on its own task and its result is discarded.
pub async fn enforce_deadline(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::Timeout(limit).into_response(),
    }
}

/// The caller's user ID. Rejects with 401 when the header is absent or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_owned()))
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// `Json<T>` that rejects with the error envelope instead of axum's plain text.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query<T>` with the same rejection as [`ApiJson`].
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// A body deserialized from JSON, or from multipart form data.
///
/// For multipart, text fields become JSON values (numbers and booleans are
/// parsed) and an uploaded file in field `x` becomes a base64 data URI under
/// `x_url`, so `image` feeds `image_url`.
#[derive(Debug)]
pub struct JsonOrMultipart<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrMultipart<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
            return Ok(Self(value));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        let fields = read_fields(&mut multipart).await?;

        serde_json::from_value(Value::Object(fields))
            .map(Self)
            .map_err(|e| ApiError::validation(format!("Invalid form data: {e}")))
    }
}

async fn read_fields(multipart: &mut Multipart) -> Result<Map<String, Value>, ApiError> {
    let mut fields = Map::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if field.file_name().is_some() {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            if bytes.is_empty() {
                continue;
            }
            fields.insert(
                format!("{name}_url"),
                Value::String(data_uri(&content_type, &bytes)),
            );
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::validation(e.body_text()))?;
            fields.insert(name, coerce(text));
        }
    }

    Ok(fields)
}

/// Inline `bytes` as a `data:` URI.
pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{content_type};base64,{encoded}")
}

fn coerce(text: String) -> Value {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_numbers_and_bools_only() {
        assert_eq!(coerce("2".into()), json!(2));
        assert_eq!(coerce(" 0.35 ".into()), json!(0.35));
        assert_eq!(coerce("true".into()), json!(true));
        assert_eq!(coerce("16:9".into()), json!("16:9"));
        assert_eq!(coerce("null".into()), json!("null"));
    }

    #[test]
    fn data_uri_encodes_payload() {
        assert_eq!(data_uri("image/png", b"hi"), "data:image/png;base64,aGk=");
    }
}
