use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{message, missing_payload, MessageResponse};
use crate::auth::{
    captcha::require_human, non_blank, normalize_identifier, valid_email, AuthError, AuthState,
    ResetRequest,
};

const CAPTCHA_REQUIRED: &str = "Captcha token is required";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForgotRequest {
    pub email: Option<String>,
    pub captcha_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/forgot",
    request_body = ForgotRequest,
    responses(
        (status = 200, description = "Unknown address, answered without revealing it", body = MessageResponse),
        (status = 201, description = "Reset email sent", body = MessageResponse),
        (status = 400, description = "Missing or invalid email", body = MessageResponse),
        (status = 403, description = "Bot check rejected or account not verified", body = MessageResponse),
        (status = 429, description = "Reset requested again within the cooldown window", body = MessageResponse),
        (status = 503, description = "Bot check unavailable", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn forgot(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotRequest>>,
) -> impl IntoResponse {
    let request: ForgotRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match request_reset(&auth_state, &request).await {
        Ok(ResetRequest::Sent) => message(
            StatusCode::CREATED,
            "Password reset email has been sent to your mail address.",
        ),
        Ok(ResetRequest::UnknownEmail) => message(
            StatusCode::OK,
            "If the email is registered, you will receive a password reset link.",
        ),
        Err(err) => err.into_response(),
    }
}

async fn request_reset(
    auth_state: &AuthState,
    request: &ForgotRequest,
) -> Result<ResetRequest, AuthError> {
    let captcha = non_blank(request.captcha_token.as_deref())
        .ok_or_else(|| AuthError::validation(CAPTCHA_REQUIRED))?;
    let email = non_blank(request.email.as_deref())
        .ok_or_else(|| AuthError::validation("Email is required"))?;
    let email = normalize_identifier(email);
    if !valid_email(&email) {
        return Err(AuthError::validation("Enter a valid email address."));
    }

    require_human(auth_state.bot_check(), Some(captcha), CAPTCHA_REQUIRED).await?;

    auth_state
        .tokens()
        .request_password_reset(&email, Utc::now())
        .await
}
