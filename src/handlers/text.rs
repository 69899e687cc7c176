//! Title generation for saved media.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::handlers::admit;
use crate::http::{ApiJson, AppState, Success};
use crate::providers::UpstreamError;

const SYSTEM_PROMPT: &str = "You write short, descriptive titles for AI-generated images and videos. \
Reply with the title only: at most six words, no quotes, no trailing punctuation.";

const MAX_PROMPT_CHARS: usize = 2000;
const MAX_TITLE_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TitleProvider {
    #[default]
    OpenAi,
    Anthropic,
}

#[derive(Debug, Deserialize)]
pub struct RenameTitleRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub provider: TitleProvider,
}

/// POST /api/titlerenamer
pub async fn rename_title(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RenameTitleRequest>,
) -> ApiResult<Success<Value>> {
    let prompt = body
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("prompt is required"))?;
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::validation(format!(
            "prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }

    admit(&state, "titlerenamer")?;

    let raw = match body.provider {
        TitleProvider::OpenAi => {
            let client = state.providers.openai.clone();
            state
                .queues
                .openai
                .enqueue(move || {
                    let client = client.clone();
                    let prompt = prompt.clone();
                    async move { client.chat(SYSTEM_PROMPT, &prompt).await }
                })
                .await?
        }
        TitleProvider::Anthropic => {
            let client = state.providers.anthropic.clone();
            state
                .queues
                .anthropic
                .enqueue(move || {
                    let client = client.clone();
                    let prompt = prompt.clone();
                    async move { client.message(SYSTEM_PROMPT, &prompt).await }
                })
                .await?
        }
    };

    let title = sanitize_title(&raw).ok_or_else(|| UpstreamError::Decode {
        provider: match body.provider {
            TitleProvider::OpenAi => "openai",
            TitleProvider::Anthropic => "anthropic",
        },
        message: "model returned an empty title".to_string(),
    })?;

    Ok(Success(json!({ "title": title })))
}

/// First line that survives cleanup: unquoted, whitespace collapsed, capped
/// at 60 chars. Lines that clean up to nothing (code fences, bare quotes) are
/// skipped.
pub fn sanitize_title(raw: &str) -> Option<String> {
    raw.lines().find_map(clean_line)
}

fn clean_line(line: &str) -> Option<String> {
    let line = line.trim();
    let line = line.strip_prefix("Title:").unwrap_or(line);
    let unquoted = line
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”' | '*'))
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | ',' | ';' | ':'));

    let collapsed = unquoted.split_whitespace().collect::<Vec<_>>().join(" ");
    let title: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim_end().to_string();

    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_model_output() {
        assert_eq!(
            sanitize_title("\"Sunset Over Misty Peaks.\"\n\nHope that helps!").as_deref(),
            Some("Sunset Over Misty Peaks")
        );
        assert_eq!(
            sanitize_title("Title:   Neon   City  Rain").as_deref(),
            Some("Neon City Rain")
        );
        assert_eq!(sanitize_title("  \n\"\"\n"), None);
    }

    #[test]
    fn skips_fences_around_title() {
        assert_eq!(
            sanitize_title("```\nSunset Peaks\n```").as_deref(),
            Some("Sunset Peaks")
        );
        assert_eq!(
            sanitize_title("\"\"\n**Golden Hour Harbor**").as_deref(),
            Some("Golden Hour Harbor")
        );
    }

    #[test]
    fn caps_length() {
        let long = "word ".repeat(40);
        let title = sanitize_title(&long).unwrap();
        assert!(title.chars().count() <= MAX_TITLE_CHARS);
        assert!(!title.ends_with(' '));
    }

    #[test]
    fn provider_defaults_to_openai() {
        let body: RenameTitleRequest = serde_json::from_str(r#"{"prompt":"x"}"#).unwrap();
        assert_eq!(body.provider, TitleProvider::OpenAi);
        let body: RenameTitleRequest =
            serde_json::from_str(r#"{"prompt":"x","provider":"anthropic"}"#).unwrap();
        assert_eq!(body.provider, TitleProvider::Anthropic);
    }
}
