//! # Authgate
//!
//! `authgate` is a small authentication service for a web application: credential
//! login, federated (OAuth consumer) login, email verification, password reset, and
//! route gating for authenticated and admin-only areas.
//!
//! ## Sessions
//!
//! Sessions are stateless. A successful login reloads the user record and mints a
//! signed claims token (HS256 JWT) carrying id, email, name, username, the admin flag
//! and the email-verification snapshot. Later requests trust those claims until the
//! token expires or is replaced, so an out-of-band admin change only shows up after
//! the next login.
//!
//! ## One-time tokens
//!
//! Verification and reset tokens are 32 random bytes, hex encoded, stored on the user
//! row and cleared on consumption. Reset tokens expire after 24 hours and a user may
//! request at most one reset email per 24 hours.
//!
//! ## Bot check
//!
//! Every state-changing auth endpoint requires a Turnstile proof token, verified
//! server-side before any store work happens.

pub mod api;
pub mod auth;
pub mod cli;
pub mod email;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
