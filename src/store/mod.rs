//! User records and the store gateway used by the auth core.
//!
//! The service only talks to storage through [`UserStore`]. The Postgres
//! implementation lives in [`postgres`]; tests use an in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use postgres::{Database, PgUserStore};

/// Identity record.
///
/// `password_hash` is absent for federated-only accounts. The token fields are
/// only populated while a verification or reset flow is in progress.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub name: String,
    pub image: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: bool,
    pub email_verified: Option<DateTime<Utc>>,
    pub verify_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub reset_last_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.email_verified.is_some()
    }
}

/// Fields needed to create a user. Email and username must already be normalized.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub name: String,
    pub image: Option<String>,
    pub password_hash: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub verify_token: Option<String>,
}

/// Outcome of an insert; uniqueness races surface as `Conflict` instead of an error.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(User),
    Conflict,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Exact match on `email` or `username`. Callers normalize the identifier first.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Case-insensitive match on either email or username, used for registration checks.
    async fn find_conflict(&self, email: &str, username: &str) -> Result<Option<User>>;

    async fn insert(&self, user: NewUser) -> Result<InsertOutcome>;

    async fn find_by_verify_token(&self, token: &str) -> Result<Option<User>>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>>;

    /// Set `email_verified` unless it is already set. The verify token stays on the
    /// row so a repeated link resolves to "already verified" instead of "invalid".
    async fn mark_email_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<()>;

    async fn store_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
        last_sent: DateTime<Utc>,
    ) -> Result<()>;

    /// Replace the password hash and clear both reset fields, only while `token`
    /// is still the stored reset token. Returns `false` when nothing was updated.
    async fn complete_password_reset(&self, id: Uuid, token: &str, password_hash: &str)
        -> Result<bool>;

    async fn ping(&self) -> Result<()>;
}
