use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{message, missing_payload, MessageResponse};
use crate::auth::{
    captcha::require_human, non_blank, normalize_identifier, password, valid_email,
    valid_username, AuthError, AuthState,
};
use crate::store::{InsertOutcome, NewUser};

pub const REGISTERED: &str =
    "Registration successful. A verification email has been sent to your email.";
const EMAIL_TAKEN: &str = "This email is already registered.";
const USERNAME_TAKEN: &str = "Sorry, that username is not available.";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub captcha_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = MessageResponse),
        (status = 400, description = "Missing or invalid field", body = MessageResponse),
        (status = 403, description = "Bot check rejected", body = MessageResponse),
        (status = 409, description = "Email or username already taken", body = MessageResponse),
        (status = 503, description = "Bot check unavailable", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match register_user(&auth_state, request).await {
        Ok(()) => message(StatusCode::CREATED, REGISTERED),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip_all)]
async fn register_user(auth_state: &AuthState, request: RegisterRequest) -> Result<(), AuthError> {
    let captcha = non_blank(request.captcha_token.as_deref())
        .ok_or_else(|| AuthError::validation("Captcha token is required"))?;
    let username = non_blank(request.username.as_deref())
        .ok_or_else(|| AuthError::validation("Username is required"))?;
    let name = non_blank(request.name.as_deref())
        .ok_or_else(|| AuthError::validation("Name is required"))?;
    let email = non_blank(request.email.as_deref())
        .ok_or_else(|| AuthError::validation("Email is required"))?;
    let secret = request
        .password
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| AuthError::validation("Password is required"))?;

    require_human(auth_state.bot_check(), Some(captcha), "Captcha token is required").await?;

    if let Some(reason) = password::weakness(secret) {
        return Err(AuthError::validation(reason));
    }
    let email = normalize_identifier(email);
    if !valid_email(&email) {
        return Err(AuthError::validation("Enter a valid email address."));
    }
    if !valid_username(username) {
        return Err(AuthError::validation(
            "Username must be lowercase letters and numbers only.",
        ));
    }
    let username = normalize_identifier(username);

    let store = auth_state.store();
    if let Some(existing) = store.find_conflict(&email, &username).await? {
        if existing.email.eq_ignore_ascii_case(&email) {
            return Err(AuthError::Conflict(EMAIL_TAKEN.to_string()));
        }
        return Err(AuthError::Conflict(USERNAME_TAKEN.to_string()));
    }

    let mut new_user = NewUser {
        email,
        username: Some(username),
        name: name.to_string(),
        image: None,
        password_hash: Some(password::hash_password(secret).await?),
        email_verified: None,
        verify_token: None,
    };
    auth_state
        .tokens()
        .issue_verification_token(&mut new_user)
        .await?;

    match store.insert(new_user).await? {
        InsertOutcome::Created(user) => {
            info!(user_id = %user.id, "User registered");
            Ok(())
        }
        InsertOutcome::Conflict => Err(AuthError::Conflict(EMAIL_TAKEN.to_string())),
    }
}
