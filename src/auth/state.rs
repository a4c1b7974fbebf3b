//! Auth configuration and the shared state handed to handlers.

use chrono::Duration;
use secrecy::SecretString;
use std::sync::Arc;

use super::captcha::BotCheck;
use super::oauth::GoogleProvider;
use super::session::SessionIssuer;
use super::tokens::TokenManager;
use crate::email::{Mailer, Templates};
use crate::store::UserStore;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_COOLDOWN_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_SITE_NAME: &str = "Authgate";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    site_name: String,
    session_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    reset_cooldown_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            site_name: DEFAULT_SITE_NAME.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            reset_cooldown_seconds: DEFAULT_RESET_COOLDOWN_SECONDS,
        }
    }

    #[must_use]
    pub fn with_site_name(mut self, site_name: String) -> Self {
        self.site_name = site_name;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.reset_cooldown_seconds = seconds;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn reset_token_ttl(&self) -> Duration {
        Duration::seconds(self.reset_token_ttl_seconds)
    }

    #[must_use]
    pub fn reset_cooldown(&self) -> Duration {
        Duration::seconds(self.reset_cooldown_seconds)
    }

    /// Cookies are only marked `Secure` when the site is served over HTTPS.
    pub(crate) fn cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    bot_check: Arc<dyn BotCheck>,
    tokens: TokenManager,
    sessions: SessionIssuer,
    google: Option<GoogleProvider>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        bot_check: Arc<dyn BotCheck>,
        mailer: Arc<dyn Mailer>,
        session_secret: &SecretString,
    ) -> Self {
        let templates = Templates::new(config.site_name().to_string(), config.base_url());
        let tokens = TokenManager::new(
            store.clone(),
            mailer,
            templates,
            config.reset_token_ttl(),
            config.reset_cooldown(),
        );
        let sessions = SessionIssuer::new(store.clone(), session_secret, config.session_ttl());
        Self {
            config,
            store,
            bot_check,
            tokens,
            sessions,
            google: None,
        }
    }

    #[must_use]
    pub fn with_google(mut self, google: GoogleProvider) -> Self {
        self.google = Some(google);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn bot_check(&self) -> &dyn BotCheck {
        self.bot_check.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    #[must_use]
    pub fn google(&self) -> Option<&GoogleProvider> {
        self.google.as_ref()
    }
}
