//! Password hashing (bcrypt) and strength rules.

use anyhow::{Context, Result};

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

const MIN_PASSWORD_LENGTH: usize = 8;

pub const WEAK_PASSWORD_MESSAGE: &str = "Password must include at least one lowercase letter, \
     one uppercase letter, one number, and one special character.";

/// Return the first strength rule the password fails, if any.
#[must_use]
pub fn weakness(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some("Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number.");
    }
    if !password
        .chars()
        .any(|c| c.is_ascii_punctuation() || c == ' ')
    {
        return Some("Password must contain at least one special character.");
    }
    None
}

/// Hash a password on the blocking pool.
///
/// # Errors
/// Returns an error if bcrypt fails or the blocking task panics.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .context("password hashing task failed")?
        .context("bcrypt hash")
}

/// Compare a plaintext password with a stored bcrypt hash on the blocking pool.
///
/// # Errors
/// Returns an error if the stored hash is malformed or the blocking task panics.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?
        .context("bcrypt verify")
}
