//! Route authorization gate for the authenticated and admin-only areas.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::session::SessionClaims;
use super::state::AuthState;

pub const LOGIN_PAGE: &str = "/auth/login";
pub const LANDING_PAGE: &str = "/dashboard";

const DASHBOARD_PREFIX: &str = "/dashboard";
const ADMIN_PREFIX: &str = "/admin";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Authenticated,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

/// `/dashboard` and `/dashboard/...` match, `/dashboards` does not.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if under(path, ADMIN_PREFIX) {
        RouteClass::Admin
    } else if under(path, DASHBOARD_PREFIX) {
        RouteClass::Authenticated
    } else {
        RouteClass::Public
    }
}

#[must_use]
pub fn decide(path: &str, session: Option<&SessionClaims>) -> Decision {
    match (classify(path), session) {
        (RouteClass::Public, _) => Decision::Allow,
        (_, None) => Decision::Redirect(LOGIN_PAGE),
        (RouteClass::Authenticated, Some(_)) => Decision::Allow,
        (RouteClass::Admin, Some(claims)) if claims.is_admin => Decision::Allow,
        (RouteClass::Admin, Some(_)) => Decision::Redirect(LANDING_PAGE),
    }
}

/// Middleware applied to every route. Valid claims are added to the request
/// extensions for downstream handlers.
pub async fn gate(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = state.sessions().from_headers(request.headers());

    match decide(request.uri().path(), claims.as_ref()) {
        Decision::Allow => {
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        Decision::Redirect(target) => {
            debug!(path = %request.uri().path(), redirect = target, "Gate redirect");
            Redirect::temporary(target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(is_admin: bool) -> SessionClaims {
        SessionClaims {
            sub: "00000000-0000-0000-0000-000000000001".to_string(),
            email: "jane@x.com".to_string(),
            name: "Jane".to_string(),
            username: Some("jane123".to_string()),
            is_admin,
            email_verified: None,
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn classify_is_segment_aware() {
        assert_eq!(classify("/dashboard"), RouteClass::Authenticated);
        assert_eq!(classify("/dashboard/settings"), RouteClass::Authenticated);
        assert_eq!(classify("/admin"), RouteClass::Admin);
        assert_eq!(classify("/admin/users/1"), RouteClass::Admin);
        assert_eq!(classify("/dashboards"), RouteClass::Public);
        assert_eq!(classify("/administrator"), RouteClass::Public);
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/login"), RouteClass::Public);
    }

    #[test]
    fn anonymous_requests() {
        assert_eq!(decide("/", None), Decision::Allow);
        assert_eq!(decide("/dashboard/x", None), Decision::Redirect(LOGIN_PAGE));
        assert_eq!(decide("/admin", None), Decision::Redirect(LOGIN_PAGE));
    }

    #[test]
    fn non_admin_is_sent_to_landing_page() {
        let user = claims(false);
        assert_eq!(decide("/dashboard", Some(&user)), Decision::Allow);
        assert_eq!(
            decide("/admin/users", Some(&user)),
            Decision::Redirect(LANDING_PAGE)
        );
    }

    #[test]
    fn admin_is_allowed_everywhere() {
        let admin = claims(true);
        assert_eq!(decide("/admin/users", Some(&admin)), Decision::Allow);
        assert_eq!(decide("/dashboard", Some(&admin)), Decision::Allow);
    }
}
