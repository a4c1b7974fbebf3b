//! Error taxonomy for auth flows and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub const GENERIC_FAILURE: &str = "Something went wrong! Try again.";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    #[error("Captcha verification was unsuccessful. Please refresh the page and try again.")]
    BotCheckFailed,

    #[error("Captcha verification service is unavailable.")]
    BotCheckUnavailable,

    /// Duplicate email or username.
    #[error("{0}")]
    Conflict(String),

    /// Unknown or already consumed token. Deliberately a 400, not a 404.
    #[error("{0}")]
    InvalidToken(&'static str),

    #[error("The provided token has been expired.")]
    ExpiredToken,

    #[error("Please wait {hours} hour(s) and {minutes} minute(s) before requesting again.")]
    Cooldown { hours: i64, minutes: i64 },

    #[error("Your account is not verified.")]
    AccountNotVerified,

    #[error("Invalid email/username or password.")]
    InvalidCredentials,

    #[error("Please verify your email address before logging in.")]
    EmailNotVerified,

    #[error("This email is already linked to a password account.")]
    AccountNotLinked,

    /// The authoritative reload during session issuance found no user.
    #[error("Unable to sign in with this account.")]
    AccessDenied,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize, Debug)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidToken(_) | Self::ExpiredToken => {
                StatusCode::BAD_REQUEST
            }
            Self::BotCheckFailed | Self::AccountNotVerified => StatusCode::FORBIDDEN,
            Self::BotCheckUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Cooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidCredentials
            | Self::EmailNotVerified
            | Self::AccountNotLinked
            | Self::AccessDenied => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Sign-in classification codes consumed by the login UI.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCredentials => Some("CredentialsSignin"),
            Self::EmailNotVerified => Some("EmailNotVerified"),
            Self::AccountNotLinked => Some("OAuthAccountNotLinked"),
            Self::AccessDenied => Some("AccessDenied"),
            _ => None,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(err) => {
                error!("Unhandled auth failure: {err:#}");
                GENERIC_FAILURE.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            message,
            error: self.code(),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            AuthError::validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::BotCheckFailed.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::BotCheckUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AuthError::Conflict("taken".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::InvalidToken("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::ExpiredToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::Cooldown {
                hours: 1,
                minutes: 2
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn cooldown_message_states_hours_and_minutes() {
        let err = AuthError::Cooldown {
            hours: 23,
            minutes: 59,
        };
        assert_eq!(
            err.to_string(),
            "Please wait 23 hour(s) and 59 minute(s) before requesting again."
        );
    }

    #[test]
    fn login_codes() {
        assert_eq!(
            AuthError::InvalidCredentials.code(),
            Some("CredentialsSignin")
        );
        assert_eq!(AuthError::EmailNotVerified.code(), Some("EmailNotVerified"));
        assert_eq!(
            AuthError::AccountNotLinked.code(),
            Some("OAuthAccountNotLinked")
        );
        assert_eq!(AuthError::BotCheckFailed.code(), None);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() -> anyhow::Result<()> {
        let response = AuthError::Internal(anyhow!("connection reset by peer")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(value["message"], GENERIC_FAILURE);
        assert!(value.get("error").is_none());
        Ok(())
    }
}
