//! HTTP handlers and the response shapes they share.

pub mod forgot;
pub mod health;
pub mod login;
pub mod oauth;
pub mod pages;
pub mod register;
pub mod reset;
pub mod root;
pub mod session;
pub mod verify;


use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Body of every non-error reply from the auth endpoints.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) fn message(status: StatusCode, text: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            message: text.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn missing_payload() -> Response {
    AuthError::validation("Missing payload").into_response()
}
