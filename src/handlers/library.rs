//! Per-user media library routes.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::require_http_url;
use crate::http::{ApiJson, ApiQuery, AppState, Success, UserId};
use crate::store::NewMediaItem;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;
const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// GET /api/library
pub async fn list_items(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Success<Value>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state.library.list(&user, limit);
    Ok(Success(json!({
        "items": items,
        "total": state.library.count(&user),
    })))
}

/// POST /api/library
pub async fn save_item(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiJson(item): ApiJson<NewMediaItem>,
) -> ApiResult<Success<Value>> {
    require_http_url("url", item.url.trim())?;
    if item
        .title
        .as_ref()
        .is_some_and(|t| t.chars().count() > MAX_TITLE_CHARS)
    {
        return Err(ApiError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }

    let item = state.library.add(&user, item);
    tracing::info!(user = %user, id = %item.id, "Media item saved");
    Ok(Success(json!({ "item": item })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub id: Option<String>,
}

/// DELETE /api/library?id=
pub async fn delete_item(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiQuery(params): ApiQuery<DeleteParams>,
) -> ApiResult<Success<Value>> {
    let id = params
        .id
        .ok_or_else(|| ApiError::validation("id is required"))?;
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::validation("id must be a UUID"))?;

    state.library.remove(&user, id)?;
    tracing::info!(user = %user, id = %id, "Media item deleted");
    Ok(Success(Value::Null))
}
