//! Placeholder pages behind the route gate.
//!
//! The gate middleware has already decided access and attached the claims; these
//! handlers only echo the session back so the areas are reachable.

use axum::{
    extract::Extension,
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::auth::SessionClaims;

pub async fn dashboard(uri: Uri, claims: Option<Extension<SessionClaims>>) -> impl IntoResponse {
    area("dashboard", &uri, claims)
}

pub async fn admin(uri: Uri, claims: Option<Extension<SessionClaims>>) -> impl IntoResponse {
    area("admin", &uri, claims)
}

fn area(
    name: &str,
    uri: &Uri,
    claims: Option<Extension<SessionClaims>>,
) -> axum::response::Response {
    match claims {
        Some(Extension(claims)) => (
            StatusCode::OK,
            Json(json!({
                "area": name,
                "path": uri.path(),
                "user": claims,
            })),
        )
            .into_response(),
        // Only reachable if the router is mounted without the gate.
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
