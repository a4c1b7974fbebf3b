use crate::{
    api,
    auth::{AuthConfig, AuthState, GoogleEndpoints, GoogleProvider, TurnstileVerifier},
    cli::commands::google,
    email::{LogMailer, Mailer, ResendMailer},
    store::{Database, PgUserStore},
};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub site_name: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub reset_cooldown_seconds: i64,
    pub turnstile_secret: SecretString,
    pub turnstile_verify_url: String,
    pub resend_api_key: Option<SecretString>,
    pub resend_api_url: String,
    pub email_from: String,
    pub google: Option<google::Options>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a collaborator cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let database = Arc::new(Database::new(args.dsn));
    let store = Arc::new(PgUserStore::new(database));

    let bot_check = Arc::new(TurnstileVerifier::new(
        args.turnstile_verify_url,
        args.turnstile_secret,
    )?);

    let mailer: Arc<dyn Mailer> = if let Some(api_key) = args.resend_api_key {
        Arc::new(ResendMailer::new(
            args.resend_api_url,
            api_key,
            args.email_from,
        )?)
    } else {
        warn!("No Resend API key configured, emails will only be logged");
        Arc::new(LogMailer)
    };

    let config = AuthConfig::new(args.base_url)
        .with_site_name(args.site_name)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
        .with_reset_cooldown_seconds(args.reset_cooldown_seconds);
    debug!("Auth config: {:?}", config);

    let mut auth_state = AuthState::new(config, store, bot_check, mailer, &args.session_secret);

    if let Some(google) = args.google {
        let provider = GoogleProvider::new(
            google.client_id,
            google.client_secret,
            auth_state.config().base_url(),
            GoogleEndpoints::default(),
        )?;
        auth_state = auth_state.with_google(provider);
    }

    api::new(args.port, Arc::new(auth_state)).await
}
