//! FAL AI client.
//!
//! Short jobs (upscaling, background removal) use the synchronous endpoint.
//! Video jobs go through FAL's queue: submit, poll the status URL, then fetch
//! the result.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::schema::FalConfig;
use crate::providers::http::{require_key, send_json};
use crate::providers::UpstreamError;

const PROVIDER: &str = "fal";

/// A file produced by a FAL model.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FalFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl FalFile {
    /// Pull the file stored under `field` out of a model's output.
    pub fn from_output(output: &Value, field: &str) -> Result<Self, UpstreamError> {
        let raw = output.get(field).ok_or_else(|| UpstreamError::Decode {
            provider: PROVIDER,
            message: format!("output has no `{field}`"),
        })?;
        serde_json::from_value(raw.clone()).map_err(|e| UpstreamError::Decode {
            provider: PROVIDER,
            message: format!("`{field}`: {e}"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct FalClient {
    http: reqwest::Client,
    config: FalConfig,
}

impl FalClient {
    pub fn new(http: reqwest::Client, config: FalConfig) -> Self {
        Self { http, config }
    }

    fn auth(&self) -> Result<String, UpstreamError> {
        Ok(format!("Key {}", require_key(PROVIDER, &self.config.api_key)?))
    }

    /// Run `model` synchronously and return its raw output.
    pub async fn run(&self, model: &str, input: &Value) -> Result<Value, UpstreamError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), model);
        tracing::debug!(model, "Running FAL model");

        let request = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.auth()?)
            .json(input);
        send_json(PROVIDER, request).await
    }

    /// Submit `model` to the queue and wait for the result.
    ///
    /// Polls every `poll_interval_ms` and gives up after `poll_timeout_secs`.
    pub async fn subscribe(&self, model: &str, input: &Value) -> Result<Value, UpstreamError> {
        let auth = self.auth()?;
        let base = self.config.queue_url.trim_end_matches('/');

        let submission: QueueSubmission = send_json(
            PROVIDER,
            self.http
                .post(format!("{base}/{model}"))
                .header(reqwest::header::AUTHORIZATION, &auth)
                .json(input),
        )
        .await?;

        let request_id = submission.request_id;
        let app = app_id(model);
        let status_url = submission
            .status_url
            .unwrap_or_else(|| format!("{base}/{app}/requests/{request_id}/status"));
        let response_url = submission
            .response_url
            .unwrap_or_else(|| format!("{base}/{app}/requests/{request_id}"));

        tracing::info!(model, request_id = %request_id, "FAL job queued");

        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.poll_timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let status: QueueStatus = send_json(
                PROVIDER,
                self.http
                    .get(&status_url)
                    .header(reqwest::header::AUTHORIZATION, &auth),
            )
            .await?;

            match status.status.as_str() {
                "COMPLETED" => {
                    if let Some(message) = status.error {
                        return Err(UpstreamError::Failed {
                            provider: PROVIDER,
                            message,
                        });
                    }
                    break;
                }
                "FAILED" | "ERROR" | "CANCELLED" => {
                    return Err(UpstreamError::Failed {
                        provider: PROVIDER,
                        message: status.error.unwrap_or(status.status),
                    });
                }
                other => {
                    tracing::debug!(request_id = %request_id, status = other, "FAL job pending");
                }
            }

            if started.elapsed() + interval > deadline {
                tracing::warn!(request_id = %request_id, model, "FAL job exceeded polling deadline");
                return Err(UpstreamError::Timeout {
                    provider: PROVIDER,
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(interval).await;
        }

        tracing::info!(
            model,
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "FAL job completed"
        );

        send_json(
            PROVIDER,
            self.http
                .get(&response_url)
                .header(reqwest::header::AUTHORIZATION, &auth),
        )
        .await
    }
}

/// FAL addresses queued requests by `owner/app`, without the model variant path.
fn app_id(model: &str) -> &str {
    let mut slashes = model.match_indices('/').map(|(i, _)| i);
    match (slashes.next(), slashes.next()) {
        (Some(_), Some(second)) => &model[..second],
        _ => model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_id_strips_variant_path() {
        assert_eq!(
            app_id("fal-ai/kling-video/v1.6/standard/image-to-video"),
            "fal-ai/kling-video"
        );
        assert_eq!(app_id("fal-ai/birefnet"), "fal-ai/birefnet");
        assert_eq!(app_id("standalone"), "standalone");
    }

    #[test]
    fn file_from_output() {
        let output = json!({
            "image": {"url": "https://cdn/x.png", "width": 2048, "height": 1024, "content_type": "image/png"},
            "seed": 42
        });
        let file = FalFile::from_output(&output, "image").unwrap();
        assert_eq!(file.url, "https://cdn/x.png");
        assert_eq!(file.width, Some(2048));

        let err = FalFile::from_output(&output, "video").unwrap_err();
        assert!(matches!(err, UpstreamError::Decode { .. }));
    }
}
