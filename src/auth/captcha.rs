//! Bot-check (Cloudflare Turnstile) verification.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{error, instrument, warn};

use super::error::AuthError;
use super::utils::non_blank;

pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotCheckOutcome {
    Passed,
    Rejected,
    /// The verification service could not be reached or answered with an error.
    Unavailable,
}

#[async_trait]
pub trait BotCheck: Send + Sync {
    async fn verify(&self, proof: &str) -> BotCheckOutcome;
}

#[derive(Deserialize, Debug)]
struct SiteVerifyResponse {
    success: bool,
}

pub struct TurnstileVerifier {
    client: Client,
    verify_url: String,
    secret: SecretString,
}

impl TurnstileVerifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(verify_url: String, secret: SecretString) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            verify_url,
            secret,
        })
    }
}

#[async_trait]
impl BotCheck for TurnstileVerifier {
    #[instrument(skip_all)]
    async fn verify(&self, proof: &str) -> BotCheckOutcome {
        let form = [
            ("secret", self.secret.expose_secret()),
            ("response", proof),
        ];

        let response = match self.client.post(&self.verify_url).form(&form).send().await {
            Ok(response) => response,
            Err(err) => {
                error!("Bot-check request failed: {err}");
                return BotCheckOutcome::Unavailable;
            }
        };

        if !response.status().is_success() {
            error!("Bot-check service answered {}", response.status());
            return BotCheckOutcome::Unavailable;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(SiteVerifyResponse { success: true }) => BotCheckOutcome::Passed,
            Ok(SiteVerifyResponse { success: false }) => {
                warn!("Bot-check proof rejected");
                BotCheckOutcome::Rejected
            }
            Err(err) => {
                error!("Bot-check response could not be decoded: {err}");
                BotCheckOutcome::Unavailable
            }
        }
    }
}

/// Gate a state-changing operation on a valid proof token.
///
/// A missing proof is rejected before any remote call is made.
///
/// # Errors
/// `Validation` when the proof is missing, `BotCheckFailed` or `BotCheckUnavailable`
/// depending on the verifier outcome.
pub async fn require_human(
    bot_check: &dyn BotCheck,
    proof: Option<&str>,
    missing_message: &str,
) -> Result<(), AuthError> {
    let Some(proof) = non_blank(proof) else {
        return Err(AuthError::validation(missing_message));
    };

    match bot_check.verify(proof).await {
        BotCheckOutcome::Passed => Ok(()),
        BotCheckOutcome::Rejected => Err(AuthError::BotCheckFailed),
        BotCheckOutcome::Unavailable => Err(AuthError::BotCheckUnavailable),
    }
}
