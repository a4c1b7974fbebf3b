//! Credential authenticator.
//!
//! Both login kinds feed [`authorize`], which returns the minimal [`Identity`] the
//! session issuer reloads from.

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::password::verify_password;
use super::utils::normalize_identifier;
use crate::store::{InsertOutcome, NewUser, UserStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Profile asserted by an external identity provider.
#[derive(Clone, Debug)]
pub struct FederatedIdentity {
    pub provider: &'static str,
    pub subject: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

pub enum Login {
    Credentials { identifier: String, secret: String },
    Federated(FederatedIdentity),
}

/// # Errors
/// `InvalidCredentials`, `EmailNotVerified` or `AccountNotLinked` on rejection,
/// `Internal` on store or hashing failure.
pub async fn authorize(
    store: &dyn UserStore,
    login: Login,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    match login {
        Login::Credentials { identifier, secret } => {
            authorize_credentials(store, &identifier, &secret).await
        }
        Login::Federated(profile) => authorize_federated(store, profile, now).await,
    }
}

#[instrument(skip_all)]
async fn authorize_credentials(
    store: &dyn UserStore,
    identifier: &str,
    secret: &str,
) -> Result<Identity, AuthError> {
    let identifier = normalize_identifier(identifier);
    let Some(user) = store.find_by_login(&identifier).await? else {
        return Err(AuthError::InvalidCredentials);
    };
    // Federated-only accounts have no password to check.
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(secret, hash).await? {
        warn!(user_id = %user.id, "Password mismatch");
        return Err(AuthError::InvalidCredentials);
    }
    // Only checked after the password matched.
    if !user.is_verified() {
        return Err(AuthError::EmailNotVerified);
    }

    Ok(Identity {
        id: user.id,
        email: user.email,
    })
}

#[instrument(skip_all, fields(provider = profile.provider))]
async fn authorize_federated(
    store: &dyn UserStore,
    profile: FederatedIdentity,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let email = normalize_identifier(&profile.email);

    if let Some(user) = store.find_by_email(&email).await? {
        if user.password_hash.is_some() {
            warn!(user_id = %user.id, "Federated login for a password account");
            return Err(AuthError::AccountNotLinked);
        }
        return Ok(Identity {
            id: user.id,
            email: user.email,
        });
    }

    let outcome = store
        .insert(NewUser {
            email,
            username: None,
            name: profile.name,
            image: profile.image,
            password_hash: None,
            email_verified: Some(now),
            verify_token: None,
        })
        .await?;

    match outcome {
        InsertOutcome::Created(user) => {
            info!(user_id = %user.id, subject = %profile.subject, "Federated account created");
            Ok(Identity {
                id: user.id,
                email: user.email,
            })
        }
        // Lost a race with a concurrent registration for the same address.
        InsertOutcome::Conflict => Err(AuthError::AccountNotLinked),
    }
}
