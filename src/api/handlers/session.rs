//! Session endpoints for cookie and bearer auth.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::error;

use crate::auth::{
    session::{clear_cookie, SESSION_COOKIE_NAME},
    AuthState, SessionClaims,
};

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session is active", body = SessionClaims),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing, forged and expired tokens all read as "no session".
    match auth_state.sessions().from_headers(&headers) {
        Some(claims) => (StatusCode::OK, Json(claims)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Sessions are stateless, so logging out only drops the cookie.
    let mut headers = HeaderMap::new();
    match clear_cookie(SESSION_COOKIE_NAME, auth_state.config().cookie_secure()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build logout cookie: {err}"),
    }
    (StatusCode::NO_CONTENT, headers).into_response()
}
