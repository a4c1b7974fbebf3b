//! Small helpers for input normalization and one-time token generation.

use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;

/// Normalize an email or login identifier for lookup/uniqueness checks.
pub(crate) fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Lowercase address format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[a-z0-9._-]+@[a-z0-9.-]+\.[a-z]{2,}$")
        .is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Usernames are lowercase letters and digits only.
pub(crate) fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-z0-9]+$").is_ok_and(|regex| regex.is_match(username))
}

/// Create a one-time token: 32 bytes from the OS RNG, hex encoded.
pub(crate) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate one-time token")?;
    Ok(hex::encode(bytes))
}

/// Treat missing and blank strings the same way.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_identifier_trims_and_lowercases() {
        assert_eq!(
            normalize_identifier(" Alice@Example.COM "),
            "alice@example.com"
        );
        assert_eq!(normalize_identifier("Jane123"), "jane123");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("jane@x.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("short@tld.c"));
    }

    #[test]
    fn valid_username_is_lowercase_alphanumeric() {
        assert!(valid_username("jane123"));
        assert!(!valid_username("Jane123"));
        assert!(!valid_username("jane_123"));
        assert!(!valid_username(""));
    }

    #[test]
    fn generate_token_is_256_bits_of_hex() {
        let token = generate_token().ok();
        let decoded_len = token
            .as_deref()
            .and_then(|token| hex::decode(token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
        assert_eq!(token.map(|token| token.len()), Some(64));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token().ok(), generate_token().ok());
    }

    #[test]
    fn non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" x ")), Some("x"));
    }
}
