//! Session issuer: stateless HS256 claims tokens and the cookie that carries them.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::credentials::Identity;
use super::error::AuthError;
use crate::store::UserStore;

pub const SESSION_COOKIE_NAME: &str = "authgate_session";

/// Claims snapshot taken from the user record at login time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub username: Option<String>,
    pub is_admin: bool,
    pub email_verified: Option<DateTime<Utc>>,
    pub iat: i64,
    pub exp: i64,
}

pub struct SessionIssuer {
    store: Arc<dyn UserStore>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            store,
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reload the user and sign a fresh claims token.
    ///
    /// Claims come from the reloaded record, never from the login-time identity.
    ///
    /// # Errors
    /// `AccessDenied` if the user no longer exists, `Internal` on store or signing failure.
    #[instrument(skip_all, fields(user_id = %identity.id))]
    pub async fn issue(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(String, SessionClaims), AuthError> {
        let Some(user) = self.store.find_by_id(identity.id).await? else {
            return Err(AuthError::AccessDenied);
        };

        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email,
            name: user.name,
            username: user.username,
            is_admin: user.is_admin,
            email_verified: user.email_verified,
            iat,
            exp: iat + self.ttl.num_seconds(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| anyhow::anyhow!("failed to sign session token: {err}"))?;
        Ok((token, claims))
    }

    /// Verify signature and expiry. Any failure means "no session".
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                debug!("Rejected session token: {err}");
                None
            }
        }
    }

    /// Resolve the session carried by a request, bearer header first.
    #[must_use]
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let token = extract_bearer_token(headers)
            .or_else(|| read_cookie(headers, SESSION_COOKIE_NAME))?;
        self.decode(&token)
    }
}

/// Build an `HttpOnly` cookie. `Secure` is only set when the site is served over HTTPS.
pub(crate) fn build_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(name, "", 0, secure)
}

pub(crate) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
