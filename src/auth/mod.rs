//! Authentication core: bot check, one-time tokens, credential checks, sessions
//! and the route gate.
//!
//! Handlers in [`crate::api`] are thin: they parse the request, run the presence checks
//! in the order the UI expects, and call into this module. Every state-changing flow
//! passes [`captcha::require_human`] before it touches the store.
//!
//! ## Reset cooldown
//!
//! A verified user can request one reset email per cooldown window (24h by default).
//! The window starts when the email is sent, not when the token is used.

pub mod captcha;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod oauth;
pub mod password;
pub mod session;
pub mod state;
pub mod tokens;
mod utils;

pub use captcha::{BotCheck, BotCheckOutcome, TurnstileVerifier};
pub use credentials::{authorize, FederatedIdentity, Identity, Login};
pub use error::AuthError;
pub use oauth::{GoogleEndpoints, GoogleProvider};
pub use session::{SessionClaims, SessionIssuer};
pub use state::{AuthConfig, AuthState};
pub use tokens::{ResetRequest, TokenManager, VerifyOutcome};

pub(crate) use utils::{generate_token, non_blank, normalize_identifier, valid_email, valid_username};
