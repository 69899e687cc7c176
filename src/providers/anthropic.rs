//! Anthropic messages client.

use serde::Deserialize;
use serde_json::json;

use crate::config::schema::AnthropicConfig;
use crate::providers::http::{require_key, send_json};
use crate::providers::UpstreamError;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, config: AnthropicConfig) -> Self {
        Self { http, config }
    }

    /// Single-turn message; returns the first text block.
    pub async fn message(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let key = require_key(PROVIDER, &self.config.api_key)?;
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });

        let request = self
            .http
            .post(url)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response: MessageResponse = send_json(PROVIDER, request).await?;

        response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| UpstreamError::Decode {
                provider: PROVIDER,
                message: "message has no text block".to_string(),
            })
    }
}
