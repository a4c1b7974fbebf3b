use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{message, missing_payload, MessageResponse};
use crate::auth::{
    captcha::require_human,
    non_blank,
    password::{weakness, WEAK_PASSWORD_MESSAGE},
    AuthError, AuthState,
};

const CAPTCHA_REQUIRED: &str = "Captcha verification is required.";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
    pub captcha_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 201, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Missing field, weak password, invalid or expired token", body = MessageResponse),
        (status = 403, description = "Bot check rejected", body = MessageResponse),
        (status = 503, description = "Bot check unavailable", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn reset(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match reset_password(&auth_state, &request).await {
        Ok(()) => message(
            StatusCode::CREATED,
            "Your password has been reset successfully.",
        ),
        Err(err) => err.into_response(),
    }
}

async fn reset_password(
    auth_state: &AuthState,
    request: &ResetPasswordRequest,
) -> Result<(), AuthError> {
    let captcha = non_blank(request.captcha_token.as_deref())
        .ok_or_else(|| AuthError::validation(CAPTCHA_REQUIRED))?;
    let token = non_blank(request.token.as_deref())
        .ok_or_else(|| AuthError::validation("Verification token is required."))?;
    let new_password = request
        .new_password
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| AuthError::validation("New password is required."))?;
    if weakness(new_password).is_some() {
        return Err(AuthError::validation(WEAK_PASSWORD_MESSAGE));
    }

    require_human(auth_state.bot_check(), Some(captcha), CAPTCHA_REQUIRED).await?;

    auth_state
        .tokens()
        .consume_reset_token(token, new_password, Utc::now())
        .await
}
