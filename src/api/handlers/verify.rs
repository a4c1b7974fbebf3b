use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{message, missing_payload, MessageResponse};
use crate::auth::{captcha::require_human, non_blank, AuthError, AuthState, VerifyOutcome};

const CAPTCHA_REQUIRED: &str = "Captcha verification is required.";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub token: Option<String>,
    pub captcha_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Email was already verified", body = MessageResponse),
        (status = 201, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Missing or invalid token", body = MessageResponse),
        (status = 403, description = "Bot check rejected", body = MessageResponse),
        (status = 503, description = "Bot check unavailable", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyRequest>>,
) -> impl IntoResponse {
    let request: VerifyRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match verify_email(&auth_state, &request).await {
        Ok(VerifyOutcome::Verified) => message(
            StatusCode::CREATED,
            "Your verification has been successful. Try to login your account.",
        ),
        Ok(VerifyOutcome::AlreadyVerified) => message(StatusCode::OK, "Email is already verified."),
        Err(err) => err.into_response(),
    }
}

async fn verify_email(
    auth_state: &AuthState,
    request: &VerifyRequest,
) -> Result<VerifyOutcome, AuthError> {
    let captcha = non_blank(request.captcha_token.as_deref())
        .ok_or_else(|| AuthError::validation(CAPTCHA_REQUIRED))?;
    let token = non_blank(request.token.as_deref())
        .ok_or_else(|| AuthError::validation("Verification token is required."))?;

    require_human(auth_state.bot_check(), Some(captcha), CAPTCHA_REQUIRED).await?;

    auth_state
        .tokens()
        .consume_verification_token(token, Utc::now())
        .await
}
