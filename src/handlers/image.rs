//! Image routes: Clarity upscaling and background removal.

use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::handlers::{admit, check_range, fal_run, require_media};
use crate::http::{AppState, JsonOrMultipart, Success};
use crate::providers::fal::FalFile;

const CLARITY_MODEL: &str = "fal-ai/clarity-upscaler";
const REMOVE_BG_MODEL: &str = "fal-ai/birefnet";

const DEFAULT_UPSCALE_PROMPT: &str = "masterpiece, best quality, highres";
const DEFAULT_NEGATIVE_PROMPT: &str = "(worst quality, low quality, normal quality:2)";

#[derive(Debug, Deserialize)]
pub struct ClarityUpscaleRequest {
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, alias = "negativePrompt")]
    pub negative_prompt: Option<String>,
    #[serde(default, alias = "upscaleFactor")]
    pub upscale_factor: Option<f64>,
    #[serde(default)]
    pub creativity: Option<f64>,
    #[serde(default)]
    pub resemblance: Option<f64>,
}

/// POST /api/clarityupscaler
pub async fn clarity_upscale(
    State(state): State<AppState>,
    JsonOrMultipart(body): JsonOrMultipart<ClarityUpscaleRequest>,
) -> ApiResult<Success<serde_json::Value>> {
    let image_url = require_media("image_url", body.image_url, "image/")?;
    check_range("upscale_factor", body.upscale_factor, 1.0, 4.0)?;
    check_range("creativity", body.creativity, 0.0, 1.0)?;
    check_range("resemblance", body.resemblance, 0.0, 1.0)?;

    admit(&state, "clarityupscaler")?;

    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPSCALE_PROMPT.to_string());
    let input = json!({
        "image_url": image_url,
        "prompt": prompt,
        "negative_prompt": body.negative_prompt.unwrap_or_else(|| DEFAULT_NEGATIVE_PROMPT.to_string()),
        "upscale_factor": body.upscale_factor.unwrap_or(2.0),
        "creativity": body.creativity.unwrap_or(0.35),
        "resemblance": body.resemblance.unwrap_or(0.6),
    });

    let output = fal_run(&state, CLARITY_MODEL, input).await?;
    let image = FalFile::from_output(&output, "image")?;
    tracing::info!(url = %image.url, "Image upscaled");

    Ok(Success(json!({ "image": image })))
}

#[derive(Debug, Deserialize)]
pub struct RemoveBackgroundRequest {
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// POST /api/removebg
pub async fn remove_background(
    State(state): State<AppState>,
    JsonOrMultipart(body): JsonOrMultipart<RemoveBackgroundRequest>,
) -> ApiResult<Success<serde_json::Value>> {
    let image_url = require_media("image_url", body.image_url, "image/")?;

    admit(&state, "removebg")?;

    let input = json!({
        "image_url": image_url,
        "output_format": "png",
    });
    let output = fal_run(&state, REMOVE_BG_MODEL, input).await?;
    let image = FalFile::from_output(&output, "image")?;
    tracing::info!(url = %image.url, "Background removed");

    Ok(Success(json!({ "image": image })))
}
