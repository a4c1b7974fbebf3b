//! In-memory [`UserStore`] for tests. Mirrors the Postgres uniqueness rules.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{InsertOutcome, NewUser, User, UserStore};

#[derive(Default)]
pub(crate) struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// Out-of-band admin promotion, standing in for a manual database edit.
    pub(crate) async fn set_admin(&self, id: Uuid, is_admin: bool) {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.is_admin = is_admin;
        }
    }

    /// Rewind `reset_last_sent`/`reset_token_expiry`, for time-dependent tests.
    pub(crate) async fn update<F: FnOnce(&mut User)>(&self, id: Uuid, f: F) {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            f(user);
        }
    }

    async fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .read()
            .await
            .values()
            .find(|user| predicate(user))
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.get(id).await)
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>> {
        Ok(self
            .find(|user| {
                user.email == identifier || user.username.as_deref() == Some(identifier)
            })
            .await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.find(|user| user.email == email).await)
    }

    async fn find_conflict(&self, email: &str, username: &str) -> Result<Option<User>> {
        let email = email.to_lowercase();
        let username = username.to_lowercase();
        Ok(self
            .find(|user| {
                user.email.to_lowercase() == email
                    || user
                        .username
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase() == username)
            })
            .await)
    }

    async fn insert(&self, new_user: NewUser) -> Result<InsertOutcome> {
        let mut users = self.users.write().await;
        let email = new_user.email.to_lowercase();
        let username = new_user.username.as_deref().map(str::to_lowercase);
        let taken = users.values().any(|user| {
            user.email.to_lowercase() == email
                || (username.is_some() && user.username.as_deref().map(str::to_lowercase) == username)
        });
        if taken {
            return Ok(InsertOutcome::Conflict);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            name: new_user.name,
            image: new_user.image,
            password_hash: new_user.password_hash,
            is_admin: false,
            email_verified: new_user.email_verified,
            verify_token: new_user.verify_token,
            reset_token: None,
            reset_token_expiry: None,
            reset_last_sent: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(InsertOutcome::Created(user))
    }

    async fn find_by_verify_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .find(|user| user.verify_token.as_deref() == Some(token))
            .await)
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .find(|user| user.reset_token.as_deref() == Some(token))
            .await)
    }

    async fn mark_email_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            if user.email_verified.is_none() {
                user.email_verified = Some(now);
                user.updated_at = now;
            }
        }
        Ok(())
    }

    async fn store_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
        last_sent: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expiry = Some(expiry);
            user.reset_last_sent = Some(last_sent);
            user.updated_at = last_sent;
        }
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) if user.reset_token.as_deref() == Some(token) => {
                user.password_hash = Some(password_hash.to_string());
                user.reset_token = None;
                user.reset_token_expiry = None;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
