//! Google OAuth 2.0 consumer (authorization code flow).

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::credentials::FederatedIdentity;

pub const PROVIDER: &str = "google";
pub const STATE_COOKIE_NAME: &str = "authgate_oauth_state";
/// Lifetime of the anti-forgery state cookie, in seconds.
pub const STATE_COOKIE_MAX_AGE: i64 = 10 * 60;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Clone, Debug)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleProvider {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    endpoints: GoogleEndpoints,
}

impl GoogleProvider {
    /// `base_url` is the public site URL; the callback lives at `/auth/callback/google`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        base_url: &str,
        endpoints: GoogleEndpoints,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri: format!("{}/auth/callback/google", base_url.trim_end_matches('/')),
            endpoints,
        })
    }

    /// # Errors
    /// Returns an error if the configured authorization URL is not a valid URL.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.endpoints.auth_url).context("invalid authorization URL")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Trade an authorization code for the provider's view of the user.
    ///
    /// # Errors
    /// Returns an error if either provider call fails or no email is released.
    #[instrument(skip_all)]
    pub async fn exchange(&self, code: &str) -> Result<FederatedIdentity> {
        let form = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let token: TokenResponse = self
            .client
            .post(&self.endpoints.token_url)
            .form(&form)
            .send()
            .await
            .context("token request failed")?
            .error_for_status()
            .context("token endpoint rejected the code")?
            .json()
            .await
            .context("invalid token response")?;

        let info: UserInfo = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("userinfo request failed")?
            .error_for_status()
            .context("userinfo endpoint rejected the token")?
            .json()
            .await
            .context("invalid userinfo response")?;

        let email = info
            .email
            .ok_or_else(|| anyhow!("provider did not release an email address"))?;
        Ok(FederatedIdentity {
            provider: PROVIDER,
            name: info.name.unwrap_or_else(|| email.clone()),
            subject: info.sub,
            email,
            image: info.picture,
        })
    }
}
