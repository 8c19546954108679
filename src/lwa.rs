//! Login with Amazon profile lookup.
//!
//! The access token is first checked against the token-info endpoint so a token
//! issued to another application is refused before the profile is requested.

use crate::config::{Region, DEFAULT_REQUEST_TIMEOUT};
use crate::errors::{AmazonPayError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Login with Amazon helper bound to one application client id.
#[derive(Debug, Clone)]
pub struct LoginWithAmazon {
    client_id: String,
    endpoint: Url,
    http: Client,
}

impl LoginWithAmazon {
    /// Creates a helper for the regional endpoint, e.g. `https://api.sandbox.amazon.com`.
    ///
    /// # Examples
    ///
    /// ```
    /// use amazon_pay::config::Region;
    /// use amazon_pay::lwa::LoginWithAmazon;
    ///
    /// let lwa = LoginWithAmazon::new("amzn1.application-oa2-client.abc", Region::Uk, true).unwrap();
    /// assert_eq!(lwa.endpoint().as_str(), "https://api.sandbox.amazon.co.uk/");
    /// ```
    pub fn new(client_id: impl Into<String>, region: Region, sandbox: bool) -> Result<Self> {
        let prefix = if sandbox { "api.sandbox" } else { "api" };
        let endpoint = Url::parse(&format!("https://{}.{}", prefix, region.lwa_host()))?;
        let http = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client_id: client_id.into(),
            endpoint,
            http,
        })
    }

    /// Sends requests to `base_url` instead of the regional host.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.endpoint = base_url;
        self
    }

    /// Uses an existing HTTP client.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Base URL of the Login with Amazon API.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the profile of the buyer owning `access_token`.
    #[tracing::instrument(skip_all, fields(client_id = %self.client_id))]
    pub async fn get_login_profile(&self, access_token: &str) -> Result<Value> {
        let token_info: Value = self
            .http
            .get(self.endpoint.join("/auth/o2/tokeninfo")?)
            .query(&[("access_token", access_token)])
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = token_info.get("error") {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(AmazonPayError::LoginError(message));
        }

        let audience = token_info
            .get("aud")
            .and_then(Value::as_str)
            .ok_or_else(|| AmazonPayError::LoginError("Client Id not present.".into()))?;
        if audience != self.client_id {
            tracing::warn!(audience, "access token issued to another client");
            return Err(AmazonPayError::LoginError("Invalid client Id.".into()));
        }

        let profile = self
            .http
            .get(self.endpoint.join("/user/profile")?)
            .header(AUTHORIZATION, format!("bearer {}", access_token))
            .send()
            .await?
            .json()
            .await?;

        Ok(profile)
    }
}
