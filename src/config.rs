//! Client configuration.
//!
//! [`ClientConfig`] is the fully resolved configuration the client is built from.
//! Resolving it from the environment is the job of [`ClientConfig::from_env`]; the
//! rest of the crate only ever sees the resolved struct.

use crate::errors::{AmazonPayError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default per-attempt deadline for API calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Region in which the merchant conducts business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Region {
    Na,
    Us,
    Uk,
    Gb,
    De,
    Eu,
    Fr,
    It,
    Es,
    Cy,
    Jp,
    Fe,
}

impl Region {
    /// Short region code, e.g. "na".
    pub fn code(&self) -> &'static str {
        match self {
            Region::Na => "na",
            Region::Us => "us",
            Region::Uk => "uk",
            Region::Gb => "gb",
            Region::De => "de",
            Region::Eu => "eu",
            Region::Fr => "fr",
            Region::It => "it",
            Region::Es => "es",
            Region::Cy => "cy",
            Region::Jp => "jp",
            Region::Fe => "fe",
        }
    }

    /// Host serving the payments API for this region.
    pub fn mws_host(&self) -> &'static str {
        match self {
            Region::Na | Region::Us => "mws.amazonservices.com",
            Region::Jp | Region::Fe => "mws.amazonservices.jp",
            _ => "mws-eu.amazonservices.com",
        }
    }

    /// Payment domain used by `ListOrderReference`.
    pub fn payment_domain(&self) -> &'static str {
        match self {
            Region::Na | Region::Us => "NA_USD",
            Region::Uk | Region::Gb => "EU_GBP",
            Region::Jp | Region::Fe => "FE_JPY",
            _ => "EU_EUR",
        }
    }

    /// Login with Amazon host suffix.
    pub fn lwa_host(&self) -> &'static str {
        match self {
            Region::Na | Region::Us => "amazon.com",
            Region::Uk | Region::Gb => "amazon.co.uk",
            Region::Jp | Region::Fe => "amazon.co.jp",
            _ => "amazon.de",
        }
    }
}

impl FromStr for Region {
    type Err = AmazonPayError;

    fn from_str(s: &str) -> Result<Self> {
        let region = match s.to_ascii_lowercase().as_str() {
            "na" => Region::Na,
            "us" => Region::Us,
            "uk" => Region::Uk,
            "gb" => Region::Gb,
            "de" => Region::De,
            "eu" => Region::Eu,
            "fr" => Region::Fr,
            "it" => Region::It,
            "es" => Region::Es,
            "cy" => Region::Cy,
            "jp" => Region::Jp,
            "fe" => Region::Fe,
            _ => return Err(AmazonPayError::InvalidRegion(s.to_string())),
        };
        Ok(region)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Backoff schedule used when the API throttles a call (HTTP 500/503).
///
/// Each entry is the pause before one attempt, so the number of entries is the
/// total number of attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// Creates a policy from explicit pauses. An empty list still allows one attempt.
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            return Self {
                delays: vec![Duration::ZERO],
            };
        }
        Self { delays }
    }

    /// Same number of attempts as the default policy, without any pause.
    pub fn immediate() -> Self {
        Self::new(vec![Duration::ZERO; 4])
    }

    /// Pauses before each attempt.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Total number of attempts.
    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }
}

impl Default for RetryPolicy {
    /// 0s, 1s, 4s, 10s: four attempts, 15 seconds of backoff at most.
    fn default() -> Self {
        Self::new(
            [0, 1, 4, 10]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
        )
    }
}

/// Fully resolved configuration for an [`AmazonPayClient`](crate::client::AmazonPayClient).
///
/// # Examples
///
/// ```
/// use amazon_pay::config::{ClientConfig, Region};
///
/// let config = ClientConfig::new("ACCESS_KEY", "SECRET_KEY", "MERCHANT_ID", Region::Na, "USD")
///     .with_sandbox(true)
///     .with_application("my-shop", "1.2.0");
///
/// assert!(config.sandbox);
/// assert!(config.handle_throttle);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// MWS access key id
    pub access_key: String,

    /// MWS secret key, used for request signing
    pub secret_key: String,

    /// Merchant (seller) id, sent as `SellerId` unless a call overrides it
    pub merchant_id: String,

    /// Region the merchant is registered in
    pub region: Region,

    /// ISO currency code filled into amount fields
    pub currency_code: String,

    /// Use the sandbox endpoint
    pub sandbox: bool,

    /// Retry throttled calls according to `retry_policy`
    pub handle_throttle: bool,

    /// Backoff schedule for throttled calls
    pub retry_policy: RetryPolicy,

    /// Deadline applied to each HTTP attempt
    pub request_timeout: Duration,

    /// Application name reported in the user agent
    pub application_name: Option<String>,

    /// Application version reported in the user agent
    pub application_version: Option<String>,

    /// Replaces scheme and host of the regional endpoint (proxies, test servers)
    pub base_url: Option<Url>,
}

impl ClientConfig {
    /// Creates a configuration with throttle handling enabled and the default retry policy.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        merchant_id: impl Into<String>,
        region: Region,
        currency_code: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            merchant_id: merchant_id.into(),
            region,
            currency_code: currency_code.into(),
            sandbox: false,
            handle_throttle: true,
            retry_policy: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            application_name: None,
            application_version: None,
            base_url: None,
        }
    }

    /// Resolves a configuration from `AP_*` environment variables.
    ///
    /// Reads `AP_MWS_ACCESS_KEY`, `AP_MWS_SECRET_KEY`, `AP_MERCHANT_ID`, `AP_REGION`
    /// and `AP_CURRENCY_CODE` (all required) and `AP_SANDBOX` (optional, "true"/"1").
    pub fn from_env() -> Result<Self> {
        fn required(var: &str, param: &str) -> Result<String> {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AmazonPayError::ConfigError(format!("Invalid {}.", param)))
        }

        let region: Region = required("AP_REGION", "region")?.parse()?;
        let sandbox = std::env::var("AP_SANDBOX")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Ok(Self::new(
            required("AP_MWS_ACCESS_KEY", "mws_access_key")?,
            required("AP_MWS_SECRET_KEY", "mws_secret_key")?,
            required("AP_MERCHANT_ID", "merchant_id")?,
            region,
            required("AP_CURRENCY_CODE", "currency_code")?,
        )
        .with_sandbox(sandbox))
    }

    /// Sets sandbox mode.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Enables or disables retrying throttled calls.
    pub fn with_throttle_handling(mut self, handle_throttle: bool) -> Self {
        self.handle_throttle = handle_throttle;
        self
    }

    /// Sets the backoff schedule for throttled calls.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the per-attempt deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the application name and version reported in the user agent.
    pub fn with_application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self.application_version = Some(version.into());
        self
    }

    /// Sends requests to `base_url` instead of the regional host.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Checks that the credentials are present.
    pub fn validate(&self) -> Result<()> {
        for (value, param) in [
            (&self.access_key, "mws_access_key"),
            (&self.secret_key, "mws_secret_key"),
            (&self.merchant_id, "merchant_id"),
            (&self.currency_code, "currency_code"),
        ] {
            if value.trim().is_empty() {
                return Err(AmazonPayError::ConfigError(format!("Invalid {}.", param)));
            }
        }
        Ok(())
    }

    /// User agent sent with every API call.
    ///
    /// ```
    /// use amazon_pay::config::{ClientConfig, Region};
    ///
    /// let config = ClientConfig::new("a", "s", "m", Region::Na, "USD")
    ///     .with_application("shop", "2.0");
    /// assert!(config.user_agent().contains("(shop/2.0; Rust; "));
    /// ```
    pub fn user_agent(&self) -> String {
        let name = self.application_name.as_deref().filter(|s| !s.is_empty());
        let version = self.application_version.as_deref().filter(|s| !s.is_empty());
        let app = match (name, version) {
            (Some(name), Some(version)) => format!("{}/{}; ", name, version),
            (Some(name), None) => format!("{}; ", name),
            (None, Some(version)) => format!("{}; ", version),
            (None, None) => String::new(),
        };

        format!(
            "amazon-pay-sdk-rust/{} ({}Rust; {}/{})",
            env!("CARGO_PKG_VERSION"),
            app,
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("merchant_id", &self.merchant_id)
            .field("region", &self.region)
            .field("currency_code", &self.currency_code)
            .field("sandbox", &self.sandbox)
            .field("handle_throttle", &self.handle_throttle)
            .field("retry_policy", &self.retry_policy)
            .field("request_timeout", &self.request_timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_lookup() {
        assert_eq!("NA".parse::<Region>().unwrap(), Region::Na);
        assert_eq!(Region::Na.mws_host(), "mws.amazonservices.com");
        assert_eq!(Region::De.mws_host(), "mws-eu.amazonservices.com");
        assert_eq!(Region::Jp.mws_host(), "mws.amazonservices.jp");
        assert!(matches!(
            "mars".parse::<Region>(),
            Err(AmazonPayError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_payment_domains() {
        assert_eq!(Region::Us.payment_domain(), "NA_USD");
        assert_eq!(Region::Gb.payment_domain(), "EU_GBP");
        assert_eq!(Region::Fe.payment_domain(), "FE_JPY");
        assert_eq!(Region::Cy.payment_domain(), "EU_EUR");
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        let total: Duration = policy.delays().iter().sum();
        assert_eq!(total, Duration::from_secs(15));
    }

    #[test]
    fn test_empty_retry_policy_allows_one_attempt() {
        assert_eq!(RetryPolicy::new(vec![]).max_attempts(), 1);
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new("a", "s", "m", Region::Uk, "GBP")
            .with_sandbox(true)
            .with_throttle_handling(false)
            .with_request_timeout(Duration::from_secs(5));

        assert!(config.sandbox);
        assert!(!config.handle_throttle);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let config = ClientConfig::new("", "s", "m", Region::Na, "USD");
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Invalid mws_access_key.");
    }

    #[test]
    fn test_user_agent_without_application() {
        let config = ClientConfig::new("a", "s", "m", Region::Na, "USD");
        let ua = config.user_agent();
        assert!(ua.starts_with("amazon-pay-sdk-rust/"));
        assert!(ua.contains("(Rust; "));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ClientConfig::new("a", "very-secret", "m", Region::Na, "USD");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
