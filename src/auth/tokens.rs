//! One-time token manager for email verification and password reset.
//!
//! Tokens are delivered before they are persisted. A failed delivery aborts the flow
//! with nothing written and no cooldown started.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::error::AuthError;
use super::password::hash_password;
use super::utils::generate_token;
use crate::email::{Mailer, Templates};
use crate::store::{NewUser, UserStore};

pub const INVALID_VERIFY_TOKEN: &str = "Invalid verification token.";
pub const INVALID_RESET_TOKEN: &str = "The provided token is invalid.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetRequest {
    Sent,
    /// No account for the address. Answered like a success to avoid enumeration.
    UnknownEmail,
}

/// Time left before another reset email may be requested, or `None` if allowed now.
#[must_use]
pub fn cooldown_remaining(
    now: DateTime<Utc>,
    last_sent: Option<DateTime<Utc>>,
    window: Duration,
) -> Option<Duration> {
    let elapsed = now - last_sent?;
    (elapsed < window).then(|| window - elapsed)
}

/// Floor a remaining duration into whole hours and leftover minutes.
fn hours_and_minutes(remaining: Duration) -> (i64, i64) {
    let hours = remaining.num_hours();
    let minutes = (remaining - Duration::hours(hours)).num_minutes();
    (hours, minutes)
}

pub struct TokenManager {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    templates: Templates,
    reset_token_ttl: Duration,
    reset_cooldown: Duration,
}

impl TokenManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        templates: Templates,
        reset_token_ttl: Duration,
        reset_cooldown: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            templates,
            reset_token_ttl,
            reset_cooldown,
        }
    }

    /// Generate a verification token for a pending registration and email it.
    ///
    /// The token is set on `user` only after delivery succeeded; the caller persists it.
    ///
    /// # Errors
    /// `Internal` if token generation or delivery fails.
    #[instrument(skip_all, fields(email = %user.email))]
    pub async fn issue_verification_token(&self, user: &mut NewUser) -> Result<(), AuthError> {
        let token = generate_token()?;
        self.mailer
            .send(&self.templates.verification(&user.email, &token))
            .await?;
        user.verify_token = Some(token);
        Ok(())
    }

    /// # Errors
    /// `InvalidToken` if no user holds the token.
    #[instrument(skip_all)]
    pub async fn consume_verification_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, AuthError> {
        let Some(user) = self.store.find_by_verify_token(token).await? else {
            return Err(AuthError::InvalidToken(INVALID_VERIFY_TOKEN));
        };

        if user.is_verified() {
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        self.store.mark_email_verified(user.id, now).await?;
        info!(user_id = %user.id, "Email verified");
        Ok(VerifyOutcome::Verified)
    }

    /// Issue and email a reset token for a verified account, subject to the cooldown.
    ///
    /// # Errors
    /// `AccountNotVerified` for unverified accounts, `Cooldown` while the window is open,
    /// `Internal` on delivery or store failure.
    #[instrument(skip_all)]
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetRequest, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(ResetRequest::UnknownEmail);
        };

        if !user.is_verified() {
            return Err(AuthError::AccountNotVerified);
        }

        if let Some(remaining) = cooldown_remaining(now, user.reset_last_sent, self.reset_cooldown)
        {
            let (hours, minutes) = hours_and_minutes(remaining);
            warn!(user_id = %user.id, "Reset requested during cooldown");
            return Err(AuthError::Cooldown { hours, minutes });
        }

        let token = generate_token()?;
        self.mailer
            .send(&self.templates.password_reset(&user.email, &token))
            .await?;
        self.store
            .store_reset_token(user.id, &token, now + self.reset_token_ttl, now)
            .await?;

        info!(user_id = %user.id, "Password reset email sent");
        Ok(ResetRequest::Sent)
    }

    /// Replace the password for the holder of `token`. The token is single-use.
    ///
    /// # Errors
    /// `InvalidToken` for unknown or already used tokens, `ExpiredToken` past expiry.
    #[instrument(skip_all)]
    pub async fn consume_reset_token(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let Some(user) = self.store.find_by_reset_token(token).await? else {
            return Err(AuthError::InvalidToken(INVALID_RESET_TOKEN));
        };
        let Some(expiry) = user.reset_token_expiry else {
            return Err(AuthError::InvalidToken(INVALID_RESET_TOKEN));
        };
        if expiry < now {
            return Err(AuthError::ExpiredToken);
        }

        let password_hash = hash_password(new_password).await?;
        // A concurrent reset may have consumed the token since the lookup.
        if !self
            .store
            .complete_password_reset(user.id, token, &password_hash)
            .await?
        {
            return Err(AuthError::InvalidToken(INVALID_RESET_TOKEN));
        }

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::email::tests::{token_from, RecordingMailer};
    use crate::store::memory::MemoryUserStore;
    use crate::store::InsertOutcome;
    use anyhow::{anyhow, Result};
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryUserStore>,
        mailer: Arc<RecordingMailer>,
        manager: TokenManager,
    }

    fn fixture_with(mailer: RecordingMailer) -> Fixture {
        let store = Arc::new(MemoryUserStore::new());
        let mailer = Arc::new(mailer);
        let manager = TokenManager::new(
            store.clone(),
            mailer.clone(),
            Templates::new("Authgate".to_string(), "https://example.com"),
            Duration::hours(24),
            Duration::hours(24),
        );
        Fixture {
            store,
            mailer,
            manager,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingMailer::default())
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: Some("jane123".to_string()),
            name: "Jane".to_string(),
            image: None,
            password_hash: Some("hash".to_string()),
            email_verified: None,
            verify_token: None,
        }
    }

    async fn insert(store: &MemoryUserStore, user: NewUser) -> Result<Uuid> {
        match store.insert(user).await? {
            InsertOutcome::Created(user) => Ok(user.id),
            InsertOutcome::Conflict => Err(anyhow!("unexpected conflict")),
        }
    }

    async fn insert_verified(store: &MemoryUserStore, email: &str) -> Result<Uuid> {
        let mut user = new_user(email);
        user.email_verified = Some(Utc::now());
        insert(store, user).await
    }

    #[test]
    fn cooldown_absent_without_previous_send() {
        assert_eq!(
            cooldown_remaining(Utc::now(), None, Duration::hours(24)),
            None
        );
    }

    #[test]
    fn cooldown_counts_down_and_expires() {
        let now = Utc::now();
        let window = Duration::hours(24);
        assert_eq!(
            cooldown_remaining(now, Some(now - Duration::minutes(1)), window),
            Some(Duration::hours(23) + Duration::minutes(59))
        );
        assert_eq!(cooldown_remaining(now, Some(now - window), window), None);
        assert_eq!(
            cooldown_remaining(now, Some(now - Duration::hours(25)), window),
            None
        );
    }

    #[test]
    fn remaining_time_is_floored() {
        let remaining = Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);
        assert_eq!(hours_and_minutes(remaining), (23, 59));
        assert_eq!(hours_and_minutes(Duration::seconds(30)), (0, 0));
    }

    #[tokio::test]
    async fn verification_token_is_sent_then_set() -> Result<()> {
        let fx = fixture();
        let mut user = new_user("jane@x.com");
        fx.manager.issue_verification_token(&mut user).await?;

        let sent = fx.mailer.last().await.ok_or_else(|| anyhow!("no email"))?;
        assert_eq!(sent.to, "jane@x.com");
        assert_eq!(user.verify_token, token_from(&sent));
        assert_eq!(user.verify_token.as_deref().map(str::len), Some(64));
        Ok(())
    }

    #[tokio::test]
    async fn failed_delivery_leaves_no_token() {
        let fx = fixture_with(RecordingMailer::failing());
        let mut user = new_user("jane@x.com");
        let result = fx.manager.issue_verification_token(&mut user).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
        assert!(user.verify_token.is_none());
    }

    #[tokio::test]
    async fn verification_is_idempotent() -> Result<()> {
        let fx = fixture();
        let mut user = new_user("jane@x.com");
        user.verify_token = Some("tok".to_string());
        let id = insert(&fx.store, user).await?;

        let first = Utc::now();
        assert_eq!(
            fx.manager.consume_verification_token("tok", first).await?,
            VerifyOutcome::Verified
        );
        assert_eq!(
            fx.manager
                .consume_verification_token("tok", first + Duration::hours(1))
                .await?,
            VerifyOutcome::AlreadyVerified
        );
        let stored = fx.store.get(id).await.ok_or_else(|| anyhow!("missing"))?;
        assert_eq!(stored.email_verified, Some(first));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_verification_token_is_invalid() {
        let fx = fixture();
        let result = fx.manager.consume_verification_token("nope", Utc::now()).await;
        assert!(matches!(
            result,
            Err(AuthError::InvalidToken(INVALID_VERIFY_TOKEN))
        ));
    }

    #[tokio::test]
    async fn reset_for_unknown_email_sends_nothing() -> Result<()> {
        let fx = fixture();
        assert_eq!(
            fx.manager
                .request_password_reset("ghost@x.com", Utc::now())
                .await?,
            ResetRequest::UnknownEmail
        );
        assert_eq!(fx.mailer.count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn reset_requires_verified_account() -> Result<()> {
        let fx = fixture();
        insert(&fx.store, new_user("jane@x.com")).await?;
        let result = fx
            .manager
            .request_password_reset("jane@x.com", Utc::now())
            .await;
        assert!(matches!(result, Err(AuthError::AccountNotVerified)));
        Ok(())
    }

    #[tokio::test]
    async fn reset_request_records_expiry_and_cooldown() -> Result<()> {
        let fx = fixture();
        let id = insert_verified(&fx.store, "jane@x.com").await?;
        let now = Utc::now();

        assert_eq!(
            fx.manager.request_password_reset("jane@x.com", now).await?,
            ResetRequest::Sent
        );
        let stored = fx.store.get(id).await.ok_or_else(|| anyhow!("missing"))?;
        let sent = fx.mailer.last().await.ok_or_else(|| anyhow!("no email"))?;
        assert_eq!(stored.reset_token, token_from(&sent));
        assert_eq!(stored.reset_token_expiry, Some(now + Duration::hours(24)));
        assert_eq!(stored.reset_last_sent, Some(now));

        let again = fx
            .manager
            .request_password_reset("jane@x.com", now + Duration::minutes(1))
            .await;
        assert!(matches!(
            again,
            Err(AuthError::Cooldown {
                hours: 23,
                minutes: 59
            })
        ));
        assert_eq!(fx.mailer.count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn reset_allowed_after_cooldown_window() -> Result<()> {
        let fx = fixture();
        insert_verified(&fx.store, "jane@x.com").await?;
        let now = Utc::now();
        fx.manager.request_password_reset("jane@x.com", now).await?;
        assert_eq!(
            fx.manager
                .request_password_reset("jane@x.com", now + Duration::hours(24))
                .await?,
            ResetRequest::Sent
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_reset_delivery_does_not_start_cooldown() -> Result<()> {
        let fx = fixture_with(RecordingMailer::failing());
        let id = insert_verified(&fx.store, "jane@x.com").await?;
        let result = fx
            .manager
            .request_password_reset("jane@x.com", Utc::now())
            .await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
        let stored = fx.store.get(id).await.ok_or_else(|| anyhow!("missing"))?;
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_last_sent.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reset_token_is_single_use() -> Result<()> {
        let fx = fixture();
        let id = insert_verified(&fx.store, "jane@x.com").await?;
        let now = Utc::now();
        fx.store
            .store_reset_token(id, "reset-tok", now + Duration::hours(24), now)
            .await?;

        fx.manager
            .consume_reset_token("reset-tok", "Bb2@bbbb", now)
            .await?;
        let stored = fx.store.get(id).await.ok_or_else(|| anyhow!("missing"))?;
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_token_expiry.is_none());
        let hash = stored.password_hash.ok_or_else(|| anyhow!("no hash"))?;
        assert!(verify_password("Bb2@bbbb", &hash).await?);

        let replay = fx
            .manager
            .consume_reset_token("reset-tok", "Cc3#cccc", now)
            .await;
        assert!(matches!(
            replay,
            Err(AuthError::InvalidToken(INVALID_RESET_TOKEN))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() -> Result<()> {
        let fx = fixture();
        let id = insert_verified(&fx.store, "jane@x.com").await?;
        let issued = Utc::now() - Duration::hours(25);
        fx.store
            .store_reset_token(id, "old", issued + Duration::hours(24), issued)
            .await?;

        let result = fx
            .manager
            .consume_reset_token("old", "Bb2@bbbb", Utc::now())
            .await;
        assert!(matches!(result, Err(AuthError::ExpiredToken)));
        let stored = fx.store.get(id).await.ok_or_else(|| anyhow!("missing"))?;
        assert_eq!(stored.password_hash.as_deref(), Some("hash"));
        Ok(())
    }

    #[tokio::test]
    async fn reset_token_without_expiry_is_invalid() -> Result<()> {
        let fx = fixture();
        let id = insert_verified(&fx.store, "jane@x.com").await?;
        fx.store
            .update(id, |user| user.reset_token = Some("dangling".to_string()))
            .await;
        let result = fx
            .manager
            .consume_reset_token("dangling", "Bb2@bbbb", Utc::now())
            .await;
        assert!(matches!(
            result,
            Err(AuthError::InvalidToken(INVALID_RESET_TOKEN))
        ));
        Ok(())
    }
}
