//! Shared request plumbing for provider clients.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::observability::metrics;
use crate::providers::UpstreamError;

/// Bodies longer than this are cut before they end up in errors and logs.
const MAX_ERROR_BODY: usize = 512;

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("imai-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| UpstreamError::Transport {
            provider: "http",
            source,
        })
}

/// Send `request`, require a 2xx, and decode the JSON body.
pub async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamError> {
    let start = Instant::now();
    let result = send_json_inner(provider, request).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) if e.is_rate_limited() => "rate_limited",
        Err(_) => "error",
    };
    metrics::record_upstream(provider, outcome, start);

    if let Err(e) = &result {
        tracing::warn!(provider, error = %e, elapsed_ms = start.elapsed().as_millis() as u64, "Upstream call failed");
    }
    result
}

async fn send_json_inner<T: DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, UpstreamError> {
    let response = request
        .send()
        .await
        .map_err(|source| UpstreamError::Transport { provider, source })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| UpstreamError::Transport { provider, source })?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            provider,
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
        provider,
        message: e.to_string(),
    })
}

/// Bearer-style key lookup shared by all clients.
pub fn require_key<'a>(
    provider: &'static str,
    key: &'a Option<String>,
) -> Result<&'a str, UpstreamError> {
    key.as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(UpstreamError::MissingCredentials { provider })
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
