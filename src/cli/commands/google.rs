use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";

#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Options {
    /// Parse Google sign-in credentials. `None` means the provider is disabled.
    ///
    /// # Errors
    /// Returns an error if only one of the two credentials is set.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Option<Self>> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        match (
            get_non_empty(ARG_GOOGLE_CLIENT_ID),
            get_non_empty(ARG_GOOGLE_CLIENT_SECRET),
        ) {
            (Some(client_id), Some(secret)) => Ok(Some(Self {
                client_id,
                client_secret: SecretString::from(secret),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => {
                anyhow::bail!("missing required argument: --{ARG_GOOGLE_CLIENT_SECRET}")
            }
            (None, Some(_)) => anyhow::bail!("missing required argument: --{ARG_GOOGLE_CLIENT_ID}"),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id; enables Google sign-in")
                .env("AUTHGATE_GOOGLE_CLIENT_ID")
                .requires(ARG_GOOGLE_CLIENT_SECRET),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("AUTHGATE_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
}
