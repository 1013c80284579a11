//! Microsoft identity platform device-code client.
//!
//! The flow is driven manually against the v2.0 endpoints: one request to
//! `devicecode` to get the user code, then repeated polls of `token` until
//! the user finishes signing in on their other device.

use serde::Deserialize;
use url::Url;

use crate::error::{DashError, DashResult};

/// Microsoft's public Office client id. Works without an app registration.
pub const CLIENT_ID: &str = "d3590ed6-52b3-4102-aeff-aad2292ab01c";

/// The "common" authority accepts accounts from any Microsoft 365 tenant.
pub const TENANT: &str = "common";

fn default_authority() -> String {
    format!("https://login.microsoftonline.com/{TENANT}/oauth2/v2.0")
}

/// Delegated scope granting access to the SharePoint tenant hosting `site_url`.
pub fn scope_for_site(site_url: &str) -> DashResult<String> {
    let url = Url::parse(site_url)
        .map_err(|e| DashError::AuthProvider(format!("Invalid site URL '{site_url}': {e}")))?;

    Ok(format!("{}/.default", url.origin().ascii_serialization()))
}

/// Successful response from the `devicecode` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: i64,
    pub interval: u64,
    pub message: String,
}

/// Successful response from the `token` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Outcome of a single token poll while the user signs in out-of-band.
#[derive(Debug)]
pub enum PollOutcome {
    /// The user hasn't finished signing in; poll again after the interval.
    Pending,
    /// The provider wants a longer interval between polls.
    SlowDown,
    /// Sign-in completed.
    Authorized(TokenResponse),
    /// The user declined, or the provider rejected the grant.
    Denied(String),
    /// The device code expired before sign-in completed.
    Expired,
}

fn classify_error(err: TokenErrorResponse) -> PollOutcome {
    match err.error.as_str() {
        "authorization_pending" => PollOutcome::Pending,
        "slow_down" => PollOutcome::SlowDown,
        "expired_token" => PollOutcome::Expired,
        "access_denied" => PollOutcome::Denied("Sign-in was declined".to_string()),
        other => {
            let detail = if err.error_description.is_empty() {
                other.to_string()
            } else {
                format!("{}: {}", other, err.error_description)
            };
            PollOutcome::Denied(detail)
        }
    }
}

/// HTTP client for the identity provider's device-code endpoints.
pub struct IdentityClient {
    http: reqwest::Client,
    authority: String,
}

impl IdentityClient {
    pub fn new() -> Self {
        Self::with_authority(default_authority())
    }

    /// Client pointed at a different v2.0 endpoint base (tests, self-hosted
    /// authorities).
    pub fn with_authority(authority: impl Into<String>) -> Self {
        IdentityClient {
            http: reqwest::Client::new(),
            authority: authority.into(),
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.authority)
    }

    /// Request a device code and user code for the given scope.
    pub async fn request_device_code(&self, scope: &str) -> DashResult<DeviceCodeResponse> {
        let response = self
            .http
            .post(self.endpoint("devicecode"))
            .form(&[("client_id", CLIENT_ID), ("scope", scope)])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashError::AuthProvider(format!(
                "devicecode request failed: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// One poll of the token endpoint. The provider's "keep waiting" errors
    /// are classified into [`PollOutcome`] instead of surfacing as errors.
    pub async fn poll_token(&self, device_code: &str) -> DashResult<PollOutcome> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("client_id", CLIENT_ID),
                ("device_code", device_code),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(PollOutcome::Authorized(response.json().await?));
        }

        let err: TokenErrorResponse = response.json().await?;
        Ok(classify_error(err))
    }
}

impl Default for IdentityClient {
    fn default() -> Self {
        Self::new()
    }
}
