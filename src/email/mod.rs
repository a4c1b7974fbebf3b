//! Outbound email: message templates and delivery backends.
//!
//! Delivery is behind [`Mailer`]. `ResendMailer` posts to the Resend HTTP API when an
//! API key is configured; otherwise `LogMailer` writes the message to the log.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error so the caller can abort the flow.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev mailer that logs the message instead of sending it.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to,
            subject = %message.subject,
            html = %message.html,
            "email send stub"
        );
        Ok(())
    }
}

pub struct ResendMailer {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    from: String,
}

impl ResendMailer {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: String, api_key: SecretString, from: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip_all, fields(to_email = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("Email send failed")?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!("Email send failed: {}", response.status()))
        }
    }
}

/// Renders the verification and reset emails.
#[derive(Clone, Debug)]
pub struct Templates {
    site_name: String,
    base_url: String,
}

impl Templates {
    #[must_use]
    pub fn new(site_name: String, base_url: &str) -> Self {
        Self {
            site_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn verify_url(&self, token: &str) -> String {
        format!("{}/auth/verify?token={token}", self.base_url)
    }

    #[must_use]
    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/auth/reset?token={token}", self.base_url)
    }

    #[must_use]
    pub fn verification(&self, to: &str, token: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Verify Your Email".to_string(),
            html: self.render(
                "Verify your email address",
                "Thanks for signing up. Please click the button below to verify your email address.",
                "Verify Email",
                &self.verify_url(token),
            ),
        }
    }

    #[must_use]
    pub fn password_reset(&self, to: &str, token: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Reset Your Password".to_string(),
            html: self.render(
                "Reset your password",
                "You requested a password reset. Click the button below to continue. \
                 This link will expire within 24 hours. And you can not change your password \
                 more than once in 24 hours.",
                "Reset Password",
                &self.reset_url(token),
            ),
        }
    }

    fn render(&self, heading: &str, message: &str, button_text: &str, url: &str) -> String {
        let site = &self.site_name;
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<body style="margin:0; padding:0; font-family: Arial, sans-serif; background-color:#f7f8fc;">
<section style="text-align: center; max-width: 520px; margin: auto; width:100%; padding:0; background-color:#f7f8fc;">
    <div style="background-color:#5c4fff; padding:12px; color:#ffffff;">
        <h1 style="font-weight:bold; font-size:42px;">{site}</h1>
    </div>
    <div style="border: 1px solid #ccc">
        <h2 style="padding:40px 32px 24px; font-size:28px; font-weight:600; color:#2c2e3e;">{heading}</h2>
        <p style="padding:0 32px 40px; font-size:16px; line-height:24px; color:#4a4d63;">{message}</p>
        <div style="padding:0 32px 40px;">
            <a href="{url}" target="_blank"
               style="background-color:#5c4fff; color:#ffffff; text-decoration:none; font-weight:600; font-size:16px; padding:14px 28px; border-radius:6px; display:inline-block;">{button_text}</a>
        </div>
        <p style="padding:0 32px 40px; font-size:16px; line-height:24px; color:#4a4d63;">Or copy this link and paste in your web browser</p>
        <p style="padding:0 32px 40px;"><a href="{url}">{url}</a></p>
        <p style="padding:0 32px 40px; font-size:14px; line-height:24px; color:#8e91a4; font-style: italic;">If you did not request this, you can safely ignore this email.</p>
        <div style="font-size:14px; color:#4a4d63; padding:16px 0 32px;">
            <p style="text-align:center;">&copy; <b>{site}</b> - All rights reserved.</p>
        </div>
    </div>
</section>
</body>
</html>
"#
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::Mutex;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Captures messages so tests can read tokens out of the links.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub(crate) sent: Mutex<Vec<EmailMessage>>,
        pub(crate) fail: bool,
    }

    impl RecordingMailer {
        pub(crate) fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub(crate) async fn last(&self) -> Option<EmailMessage> {
            self.sent.lock().await.last().cloned()
        }

        pub(crate) async fn count(&self) -> usize {
            self.sent.lock().await.len()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<()> {
            if self.fail {
                return Err(anyhow!("Email send failed"));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    /// Pull the `token=` query value out of a rendered email.
    pub(crate) fn token_from(message: &EmailMessage) -> Option<String> {
        let start = message.html.find("?token=")? + "?token=".len();
        let token: String = message.html[start..]
            .chars()
            .take_while(char::is_ascii_hexdigit)
            .collect();
        Some(token)
    }

    #[test]
    fn links_use_base_url_without_trailing_slash() {
        let templates = Templates::new("Site".to_string(), "https://example.com/");
        assert_eq!(
            templates.verify_url("abc"),
            "https://example.com/auth/verify?token=abc"
        );
        assert_eq!(
            templates.reset_url("abc"),
            "https://example.com/auth/reset?token=abc"
        );
    }

    #[test]
    fn verification_email_embeds_link_and_site() {
        let templates = Templates::new("Authgate".to_string(), "https://example.com");
        let message = templates.verification("jane@x.com", "deadbeef");
        assert_eq!(message.to, "jane@x.com");
        assert_eq!(message.subject, "Verify Your Email");
        assert!(message.html.contains("https://example.com/auth/verify?token=deadbeef"));
        assert!(message.html.contains("Authgate"));
        assert_eq!(token_from(&message).as_deref(), Some("deadbeef"));
    }

    #[test]
    fn reset_email_mentions_expiry() {
        let templates = Templates::new("Authgate".to_string(), "https://example.com");
        let message = templates.password_reset("jane@x.com", "cafe");
        assert_eq!(message.subject, "Reset Your Password");
        assert!(message.html.contains("/auth/reset?token=cafe"));
        assert!(message.html.contains("24 hours"));
    }

    #[tokio::test]
    async fn resend_mailer_posts_with_bearer_key() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = ResendMailer::new(
            format!("{}/emails", server.uri()),
            SecretString::from("re_test"),
            "noreply@example.com".to_string(),
        )?;
        let templates = Templates::new("Authgate".to_string(), "https://example.com");
        mailer
            .send(&templates.verification("jane@x.com", "abc"))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn resend_mailer_surfaces_api_errors() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let mailer = ResendMailer::new(
            format!("{}/emails", server.uri()),
            SecretString::from("re_test"),
            "noreply@example.com".to_string(),
        )?;
        let templates = Templates::new("Authgate".to_string(), "https://example.com");
        assert!(mailer
            .send(&templates.password_reset("jane@x.com", "abc"))
            .await
            .is_err());
        Ok(())
    }
}
