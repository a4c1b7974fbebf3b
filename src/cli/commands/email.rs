use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_RESEND_API_KEY: &str = "resend-api-key";
pub const ARG_RESEND_API_URL: &str = "resend-api-url";
pub const ARG_EMAIL_FROM: &str = "email-from";

#[derive(Debug)]
pub struct Options {
    /// When absent, messages are logged instead of sent.
    pub resend_api_key: Option<SecretString>,
    pub resend_api_url: String,
    pub from: String,
}

impl Options {
    /// Parse email delivery arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the sender address is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            resend_api_key: get_non_empty(ARG_RESEND_API_KEY).map(SecretString::from),
            resend_api_url: get_non_empty(ARG_RESEND_API_URL)
                .unwrap_or_else(|| crate::email::RESEND_API_URL.to_string()),
            from: get_non_empty(ARG_EMAIL_FROM)
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_EMAIL_FROM}"))?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RESEND_API_KEY)
                .long(ARG_RESEND_API_KEY)
                .help("Resend API key; without it emails are only logged")
                .env("AUTHGATE_RESEND_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_RESEND_API_URL)
                .long(ARG_RESEND_API_URL)
                .help("Resend send-email endpoint")
                .env("AUTHGATE_RESEND_API_URL")
                .default_value(crate::email::RESEND_API_URL),
        )
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address for verification and reset emails")
                .env("AUTHGATE_EMAIL_FROM")
                .default_value("Authgate <no-reply@authgate.dev>"),
        )
}
