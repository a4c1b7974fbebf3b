//! Map validated CLI matches to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, email, google, ARG_BASE_URL, ARG_DSN, ARG_PORT, ARG_SITE_NAME};
use anyhow::{Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let base_url = matches
        .get_one::<String>(ARG_BASE_URL)
        .cloned()
        .context("missing required argument: --base-url")?;
    Url::parse(&base_url).with_context(|| format!("invalid --{ARG_BASE_URL}: {base_url}"))?;

    let site_name = matches
        .get_one::<String>(ARG_SITE_NAME)
        .cloned()
        .unwrap_or_else(|| "Authgate".to_string());

    let auth_opts = auth::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches)?;
    let google_opts = google::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        base_url,
        site_name,
        session_secret: auth_opts.session_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        reset_cooldown_seconds: auth_opts.reset_cooldown_seconds,
        turnstile_secret: auth_opts.turnstile_secret,
        turnstile_verify_url: auth_opts.turnstile_verify_url,
        resend_api_key: email_opts.resend_api_key,
        resend_api_url: email_opts.resend_api_url,
        email_from: email_opts.from,
        google: google_opts,
    }))
}
