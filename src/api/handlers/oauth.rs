//! Google sign-in redirect and callback.
//!
//! Failures send the browser back to the login page with an `error` code the UI
//! knows how to render.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::{
    authorize,
    gate::{LANDING_PAGE, LOGIN_PAGE},
    generate_token,
    oauth::{STATE_COOKIE_MAX_AGE, STATE_COOKIE_NAME},
    session::{build_cookie, clear_cookie, read_cookie, SESSION_COOKIE_NAME},
    AuthError, AuthState, Login,
};

/// Generic code for anything that goes wrong talking to the provider.
const CALLBACK_ERROR: &str = "OAuthCallback";
const SIGNIN_ERROR: &str = "OAuthSignin";

#[derive(Deserialize, Debug)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn login_error(code: &str) -> Response {
    Redirect::temporary(&format!("{LOGIN_PAGE}?error={code}")).into_response()
}

pub async fn google_signin(auth_state: Extension<Arc<AuthState>>) -> Response {
    let Some(google) = auth_state.google() else {
        return login_error(SIGNIN_ERROR);
    };

    let redirect = generate_token().and_then(|state| {
        let url = google.authorization_url(&state)?;
        let cookie = build_cookie(
            STATE_COOKIE_NAME,
            &state,
            STATE_COOKIE_MAX_AGE,
            auth_state.config().cookie_secure(),
        )?;
        Ok((url, cookie))
    });

    match redirect {
        Ok((url, cookie)) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (headers, Redirect::temporary(&url)).into_response()
        }
        Err(err) => {
            error!("Failed to start Google sign-in: {err:#}");
            login_error(SIGNIN_ERROR)
        }
    }
}

pub async fn google_callback(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(google) = auth_state.google() else {
        return login_error(SIGNIN_ERROR);
    };
    let secure = auth_state.config().cookie_secure();

    if let Some(provider_error) = params.error.as_deref() {
        warn!("Provider returned an error: {provider_error}");
        return login_error(CALLBACK_ERROR);
    }

    let expected = read_cookie(&headers, STATE_COOKIE_NAME);
    let (Some(code), Some(state)) = (params.code.as_deref(), params.state.as_deref()) else {
        return login_error(CALLBACK_ERROR);
    };
    if expected.as_deref() != Some(state) {
        warn!("OAuth state mismatch");
        return login_error(CALLBACK_ERROR);
    }

    let profile = match google.exchange(code).await {
        Ok(profile) => profile,
        Err(err) => {
            error!("Google code exchange failed: {err:#}");
            return login_error(CALLBACK_ERROR);
        }
    };

    let now = Utc::now();
    let issued = match authorize(auth_state.store(), Login::Federated(profile), now).await {
        Ok(identity) => auth_state.sessions().issue(&identity, now).await,
        Err(err) => Err(err),
    };

    let (token, claims) = match issued {
        Ok(issued) => issued,
        Err(err) => return login_error(callback_code(&err)),
    };
    info!(user_id = %claims.sub, "Federated login");

    let session_cookie = build_cookie(
        SESSION_COOKIE_NAME,
        &token,
        auth_state.sessions().ttl().num_seconds(),
        secure,
    );
    let state_cookie = clear_cookie(STATE_COOKIE_NAME, secure);
    match (session_cookie, state_cookie) {
        (Ok(session_cookie), Ok(state_cookie)) => {
            let mut response_headers = HeaderMap::new();
            response_headers.append(SET_COOKIE, session_cookie);
            response_headers.append(SET_COOKIE, state_cookie);
            (response_headers, Redirect::temporary(LANDING_PAGE)).into_response()
        }
        (Err(err), _) | (_, Err(err)) => {
            error!("Failed to build session cookie: {err}");
            login_error(CALLBACK_ERROR)
        }
    }
}

fn callback_code(err: &AuthError) -> &'static str {
    if let AuthError::Internal(inner) = err {
        error!("Federated login failed: {inner:#}");
    }
    err.code().unwrap_or(CALLBACK_ERROR)
}
