use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RESET_TOKEN_TTL_SECONDS: &str = "reset-token-ttl-seconds";
pub const ARG_RESET_COOLDOWN_SECONDS: &str = "reset-cooldown-seconds";
pub const ARG_TURNSTILE_SECRET: &str = "turnstile-secret";
pub const ARG_TURNSTILE_VERIFY_URL: &str = "turnstile-verify-url";

/// HS256 keys shorter than this are rejected at startup.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug)]
pub struct Options {
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub reset_cooldown_seconds: i64,
    pub turnstile_secret: SecretString,
    pub turnstile_verify_url: String,
}

impl Options {
    /// Parse session, one-time token and bot-check arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a secret is missing or the session secret is too short.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let session_secret = read_required(ARG_SESSION_SECRET)?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            anyhow::bail!(
                "--{ARG_SESSION_SECRET} must be at least {MIN_SESSION_SECRET_LEN} characters"
            );
        }

        let read_seconds = |id: &str| matches.get_one::<i64>(id).copied().unwrap_or_default();

        Ok(Self {
            session_secret: SecretString::from(session_secret),
            session_ttl_seconds: read_seconds(ARG_SESSION_TTL_SECONDS),
            reset_token_ttl_seconds: read_seconds(ARG_RESET_TOKEN_TTL_SECONDS),
            reset_cooldown_seconds: read_seconds(ARG_RESET_COOLDOWN_SECONDS),
            turnstile_secret: SecretString::from(read_required(ARG_TURNSTILE_SECRET)?),
            turnstile_verify_url: read_required(ARG_TURNSTILE_VERIFY_URL)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_turnstile_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Key used to sign session tokens")
                .env("AUTHGATE_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("AUTHGATE_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_SECONDS)
                .long(ARG_RESET_TOKEN_TTL_SECONDS)
                .help("Password reset token lifetime in seconds")
                .env("AUTHGATE_RESET_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RESET_COOLDOWN_SECONDS)
                .long(ARG_RESET_COOLDOWN_SECONDS)
                .help("Minimum time between two password reset emails")
                .env("AUTHGATE_RESET_COOLDOWN_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(0..)),
        )
}

fn with_turnstile_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TURNSTILE_SECRET)
                .long(ARG_TURNSTILE_SECRET)
                .help("Turnstile secret key used to verify bot-check tokens")
                .env("AUTHGATE_TURNSTILE_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TURNSTILE_VERIFY_URL)
                .long(ARG_TURNSTILE_VERIFY_URL)
                .help("Turnstile siteverify endpoint")
                .env("AUTHGATE_TURNSTILE_VERIFY_URL")
                .default_value(crate::auth::captcha::TURNSTILE_VERIFY_URL),
        )
}
