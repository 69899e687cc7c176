//! Video routes: upscaling and Kling generation.
//!
//! Both go through FAL's queue API, so a request holds its connection until
//! the job finishes or the polling deadline passes (504).

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::handlers::{admit, check_range, fal_subscribe, require_media};
use crate::http::{AppState, JsonOrMultipart, Success};
use crate::providers::fal::FalFile;

const VIDEO_UPSCALE_MODEL: &str = "fal-ai/video-upscaler";
const KLING_TEXT_MODEL: &str = "fal-ai/kling-video/v1.6/standard/text-to-video";
const KLING_IMAGE_MODEL: &str = "fal-ai/kling-video/v1.6/standard/image-to-video";

const MAX_PROMPT_CHARS: usize = 2500;
const ASPECT_RATIOS: &[&str] = &["16:9", "9:16", "1:1"];

#[derive(Debug, Deserialize)]
pub struct VideoUpscaleRequest {
    #[serde(default, alias = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
}

/// POST /api/videoupscaler
pub async fn upscale_video(
    State(state): State<AppState>,
    JsonOrMultipart(body): JsonOrMultipart<VideoUpscaleRequest>,
) -> ApiResult<Success<Value>> {
    let video_url = require_media("video_url", body.video_url, "video/")?;
    check_range("scale", body.scale, 1.0, 4.0)?;

    admit(&state, "videoupscaler")?;

    let input = json!({
        "video_url": video_url,
        "scale": body.scale.unwrap_or(2.0),
    });
    let output = fal_subscribe(&state, VIDEO_UPSCALE_MODEL, input).await?;
    let video = FalFile::from_output(&output, "video")?;
    tracing::info!(url = %video.url, "Video upscaled");

    Ok(Success(json!({ "video": video })))
}

#[derive(Debug, Deserialize)]
pub struct KlingRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default, alias = "aspectRatio")]
    pub aspect_ratio: Option<String>,
    #[serde(default, alias = "negativePrompt")]
    pub negative_prompt: Option<String>,
    #[serde(default, alias = "cfgScale")]
    pub cfg_scale: Option<f64>,
}

/// POST /api/kling
///
/// Text-to-video, or image-to-video when `image_url` is given.
pub async fn kling(
    State(state): State<AppState>,
    JsonOrMultipart(body): JsonOrMultipart<KlingRequest>,
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

    let duration = parse_duration(body.duration.as_ref())?;
    let aspect_ratio = body.aspect_ratio.unwrap_or_else(|| "16:9".to_string());
    if !ASPECT_RATIOS.contains(&aspect_ratio.as_str()) {
        return Err(ApiError::validation(format!(
            "aspect_ratio must be one of {}",
            ASPECT_RATIOS.join(", ")
        )));
    }
    check_range("cfg_scale", body.cfg_scale, 0.0, 1.0)?;

    let image_url = match body.image_url.filter(|u| !u.trim().is_empty()) {
        Some(url) => Some(require_media("image_url", Some(url), "image/")?),
        None => None,
    };

    admit(&state, "kling")?;

    let mut input = json!({
        "prompt": prompt,
        "duration": duration,
        "aspect_ratio": aspect_ratio,
        "cfg_scale": body.cfg_scale.unwrap_or(0.5),
    });
    if let Some(negative) = body.negative_prompt.filter(|n| !n.trim().is_empty()) {
        input["negative_prompt"] = Value::String(negative);
    }

    let model = match image_url {
        Some(url) => {
            input["image_url"] = Value::String(url);
            KLING_IMAGE_MODEL
        }
        None => KLING_TEXT_MODEL,
    };

    let output = fal_subscribe(&state, model, input).await?;
    let video = FalFile::from_output(&output, "video")?;
    tracing::info!(model, url = %video.url, "Kling video generated");

    Ok(Success(json!({ "video": video })))
}

/// Kling accepts "5" or "10" seconds; callers send either strings or numbers.
fn parse_duration(value: Option<&Value>) -> ApiResult<&'static str> {
    let seconds = match value {
        None | Some(Value::Null) => return Ok("5"),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('s').parse::<f64>().ok(),
        Some(_) => None,
    };
    match seconds {
        Some(s) if s == 5.0 => Ok("5"),
        Some(s) if s == 10.0 => Ok("10"),
        _ => Err(ApiError::validation("duration must be 5 or 10")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accepts_strings_and_numbers() {
        assert_eq!(parse_duration(None).unwrap(), "5");
        assert_eq!(parse_duration(Some(&json!(10))).unwrap(), "10");
        assert_eq!(parse_duration(Some(&json!("5"))).unwrap(), "5");
        assert_eq!(parse_duration(Some(&json!("10s"))).unwrap(), "10");
        assert!(parse_duration(Some(&json!(7))).is_err());
        assert!(parse_duration(Some(&json!([5]))).is_err());
    }
}
