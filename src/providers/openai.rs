//! OpenAI chat completions client.

use serde::Deserialize;
use serde_json::json;

use crate::config::schema::OpenAiConfig;
use crate::providers::http::{require_key, send_json};
use crate::providers::UpstreamError;

const PROVIDER: &str = "openai";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { http, config }
    }

    /// Single-turn chat; returns the first choice's text.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let key = require_key(PROVIDER, &self.config.api_key)?;
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.7,
        });

        let completion: ChatCompletion =
            send_json(PROVIDER, self.http.post(url).bearer_auth(key).json(&body)).await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| UpstreamError::Decode {
                provider: PROVIDER,
                message: "completion has no content".to_string(),
            })
    }
}
