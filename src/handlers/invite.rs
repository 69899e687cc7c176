//! Invite routes.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::http::{ApiJson, AppState, Success, UserId};
use crate::store::invites::is_valid_email;

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/invite
pub async fn create_invite(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiJson(body): ApiJson<CreateInviteRequest>,
) -> ApiResult<Success<Value>> {
    let email = body
        .email
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| ApiError::validation("A valid email is required"))?;

    let invite = state.invites.create(&user, &email)?;
    tracing::info!(user = %user, code = %invite.code, "Invite created");
    Ok(Success(json!({ "invite": invite })))
}

#[derive(Debug, Deserialize)]
pub struct RedeemInviteRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// POST /api/invite/redeem
pub async fn redeem_invite(
    State(state): State<AppState>,
    UserId(user): UserId,
    ApiJson(body): ApiJson<RedeemInviteRequest>,
) -> ApiResult<Success<Value>> {
    let code = body
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::validation("code is required"))?;

    let invite = state.invites.redeem(&code, &user)?;
    tracing::info!(user = %user, code = %invite.code, "Invite redeemed");
    Ok(Success(json!({ "invite": invite })))
}
