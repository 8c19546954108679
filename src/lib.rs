//! # amazon-pay-rs
//!
//! An async Rust client for the Amazon Pay (Off-Amazon Payments) API and an
//! authenticator for the instant payment notifications it pushes.
//!
//! ## Features
//!
//! - **Signed requests**: canonical parameter encoding and HMAC-SHA256 signatures
//! - **Throttle handling**: HTTP 500/503 responses are retried with backoff
//! - **Structured responses**: XML responses exposed as raw XML, JSON and a `serde_json` tree
//! - **Every API action**: one generic [`invoke`](client::AmazonPayClient::invoke) entry
//!   point driven by per-action field tables, plus typed helpers for the order lifecycle
//! - **IPN authentication**: topic check, certificate URL validation and RSA signature
//!   verification of pushed notifications
//! - **Log redaction**: buyer addresses and free-text notes never reach the logs
//!
//! ## Quick Start
//!
//! ### Calling the API
//!
//! ```rust,no_run
//! use amazon_pay::client::AmazonPayClient;
//! use amazon_pay::config::{ClientConfig, Region};
//! use amazon_pay::operations::Fields;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("ACCESS_KEY", "SECRET_KEY", "MERCHANT_ID", Region::Na, "USD")
//!     .with_sandbox(true);
//! let client = AmazonPayClient::new(config)?;
//!
//! let response = client
//!     .authorize("S01-1234567-1234567", "auth-ref-1", "19.99", Fields::new())
//!     .await?;
//!
//! if response.success() {
//!     println!("{}", response.to_json());
//! } else {
//!     eprintln!("rejected: {}", response.to_xml());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Authenticating a notification
//!
//! ```rust,no_run
//! use amazon_pay::ipn::IpnHandler;
//! use reqwest::header::HeaderMap;
//!
//! # async fn example(body: Vec<u8>, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
//! let mut handler = IpnHandler::new(&body, &headers)?;
//! handler.authenticate().await?;
//!
//! let notification = handler.to_response()?;
//! println!("{}", notification.response_type());
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Business rejections come back as a [`PaymentResponse`] with `success() == false`.
//! [`AmazonPayError`] is reserved for configuration problems, transport failures,
//! malformed payloads and failed notification authentication.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and spans and installs no subscriber of its own.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod errors;
pub mod ipn;
pub mod lwa;
pub mod operations;
pub mod request;
pub mod response;
pub mod sanitize;
pub mod signer;
pub mod types;

// Re-export commonly used items
pub use client::{AmazonPayClient, ChargeOptions, PaymentDetails, SellerScope};
pub use config::{ClientConfig, Region, RetryPolicy};
pub use errors::{AmazonPayError, Result};
pub use ipn::{CertificateFetcher, IpnHandler};
pub use operations::Fields;
pub use response::PaymentResponse;
pub use types::{Action, Params, API_VERSION};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(API_VERSION, "2013-01-01");
    }

    #[test]
    fn test_module_accessibility() {
        let config = ClientConfig::new("key", "secret", "merchant", Region::Na, "USD");
        let _ = AmazonPayClient::new(config).unwrap();
        let _ = lwa::LoginWithAmazon::new("client", Region::Na, false).unwrap();
        let _ = Fields::new().set("merchant_id", "merchant");
    }
}
