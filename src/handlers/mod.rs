//! API route handlers.
//!
//! Each AI route follows the same steps: validate the body, consult the rate
//! limiter under the route's key, then run the provider call through that
//! provider's queue.

pub mod health;
pub mod image;
pub mod invite;
pub mod library;
pub mod text;
pub mod video;

use serde_json::Value;
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::http::AppState;

/// Consult the rate limiter for `key`.
///
/// Advisory unless `rate_limit.enforce` is set: an over-budget request is
/// logged and allowed through.
pub(crate) fn admit(state: &AppState, key: &'static str) -> ApiResult<()> {
    let limits = &state.config.rate_limit;
    if !limits.enabled {
        return Ok(());
    }

    let status = state.limiter.check_limit(key);
    if status.allowed {
        return Ok(());
    }

    if limits.enforce {
        return Err(ApiError::RateLimited {
            retry_after: status.retry_after(),
        });
    }

    tracing::warn!(
        key,
        reset_in_ms = status.retry_after().as_millis() as u64,
        "Rate limit exceeded, proceeding anyway"
    );
    Ok(())
}

/// Run a short FAL model through the FAL queue.
pub(crate) async fn fal_run(state: &AppState, model: &'static str, input: Value) -> ApiResult<Value> {
    let fal = state.providers.fal.clone();
    let output = state
        .queues
        .fal
        .enqueue(move || {
            let fal = fal.clone();
            let input = input.clone();
            async move { fal.run(model, &input).await }
        })
        .await?;
    Ok(output)
}

/// Submit a long-running FAL model and wait for it, through the FAL queue.
pub(crate) async fn fal_subscribe(
    state: &AppState,
    model: &'static str,
    input: Value,
) -> ApiResult<Value> {
    let fal = state.providers.fal.clone();
    let output = state
        .queues
        .fal
        .enqueue(move || {
            let fal = fal.clone();
            let input = input.clone();
            async move { fal.subscribe(model, &input).await }
        })
        .await?;
    Ok(output)
}

/// Require a non-empty media reference: an http(s) URL, or a `data:` URI
/// whose MIME type starts with `mime_prefix`.
pub(crate) fn require_media(
    field: &str,
    value: Option<String>,
    mime_prefix: &str,
) -> ApiResult<String> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))?;

    if let Some(rest) = value.strip_prefix("data:") {
        if rest.starts_with(mime_prefix) && rest.contains(";base64,") {
            return Ok(value);
        }
        return Err(ApiError::validation(format!(
            "{field} must be a base64 {mime_prefix}* data URI"
        )));
    }

    require_http_url(field, &value)?;
    Ok(value)
}

pub(crate) fn require_http_url(field: &str, value: &str) -> ApiResult<()> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ApiError::validation(format!("{field} must be an http(s) URL"))),
    }
}

/// Check an optional number lies in `[min, max]`.
pub(crate) fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> ApiResult<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ApiError::validation(format!(
            "{field} must be between {min} and {max}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_reference_validation() {
        assert!(require_media("image_url", Some("https://x/y.png".into()), "image/").is_ok());
        assert!(require_media("image_url", Some("data:image/png;base64,AA==".into()), "image/").is_ok());
        assert!(require_media("image_url", Some("data:text/plain;base64,AA==".into()), "image/").is_err());
        assert!(require_media("image_url", Some("ftp://x/y.png".into()), "image/").is_err());
        assert!(require_media("image_url", Some("   ".into()), "image/").is_err());
        assert!(require_media("image_url", None, "image/").is_err());
    }

    #[test]
    fn range_validation() {
        assert!(check_range("scale", None, 1.0, 4.0).is_ok());
        assert!(check_range("scale", Some(4.0), 1.0, 4.0).is_ok());
        assert!(check_range("scale", Some(4.5), 1.0, 4.0).is_err());
    }
}
