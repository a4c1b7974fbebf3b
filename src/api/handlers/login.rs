use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::missing_payload;
use crate::auth::{
    authorize,
    captcha::require_human,
    error::GENERIC_FAILURE,
    non_blank,
    session::{build_cookie, SESSION_COOKIE_NAME},
    AuthError, AuthState, Login, SessionClaims,
};

const FIELDS_REQUIRED: &str = "All fields are required.";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address or username.
    #[serde(alias = "identifier")]
    pub email: Option<String>,
    pub password: Option<String>,
    pub captcha_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    /// Signed claims token, also set as the session cookie.
    pub token: String,
    pub user: SessionClaims,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginError {
    pub message: String,
    /// `CredentialsSignin`, `EmailNotVerified`, `OAuthAccountNotLinked` or `AccessDenied`.
    pub error: Option<String>,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 400, description = "Missing field", body = LoginError),
        (status = 401, description = "Credentials rejected", body = LoginError),
        (status = 403, description = "Bot check rejected", body = LoginError),
        (status = 503, description = "Bot check unavailable", body = LoginError)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return missing_payload(),
    };

    match credential_login(&auth_state, request).await {
        Ok((token, claims)) => session_response(&auth_state, StatusCode::OK, token, claims),
        Err(err) => err.into_response(),
    }
}

#[instrument(skip_all)]
async fn credential_login(
    auth_state: &AuthState,
    request: LoginRequest,
) -> Result<(String, SessionClaims), AuthError> {
    let (Some(identifier), Some(secret), Some(captcha)) = (
        non_blank(request.email.as_deref()),
        request.password.as_deref().filter(|secret| !secret.is_empty()),
        non_blank(request.captcha_token.as_deref()),
    ) else {
        return Err(AuthError::validation(FIELDS_REQUIRED));
    };

    require_human(auth_state.bot_check(), Some(captcha), FIELDS_REQUIRED).await?;

    let now = Utc::now();
    let login = Login::Credentials {
        identifier: identifier.to_string(),
        secret: secret.to_string(),
    };
    let identity = authorize(auth_state.store(), login, now).await?;
    let issued = auth_state.sessions().issue(&identity, now).await?;
    info!(user_id = %identity.id, "Credential login");
    Ok(issued)
}

/// JSON body with the claims plus the session cookie.
pub(crate) fn session_response(
    auth_state: &AuthState,
    status: StatusCode,
    token: String,
    claims: SessionClaims,
) -> Response {
    let mut headers = HeaderMap::new();
    match build_cookie(
        SESSION_COOKIE_NAME,
        &token,
        auth_state.sessions().ttl().num_seconds(),
        auth_state.config().cookie_secure(),
    ) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": GENERIC_FAILURE })),
            )
                .into_response();
        }
    }

    (
        status,
        headers,
        Json(LoginResponse {
            token,
            user: claims,
        }),
    )
        .into_response()
}
