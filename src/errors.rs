//! Error types for the amazon-pay-rs library.
//!
//! Business-level rejections from the API are not errors: they come back as a
//! [`PaymentResponse`](crate::response::PaymentResponse) with `success == false`.
//! This enum covers configuration problems, transport failures, malformed payloads
//! and notification authentication failures.

use thiserror::Error;

/// Main error type for Amazon Pay operations.
#[derive(Error, Debug)]
pub enum AmazonPayError {
    /// Error during HTTP request/response handling (connection, TLS, DNS, timeout)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Missing or invalid client configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unknown region code
    #[error("Invalid region code ({0})")]
    InvalidRegion(String),

    /// Unknown, missing or malformed operation parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Response or notification payload is not well-formed XML
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// Missing required field in a notification envelope
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Topic ARN header missing or different from the one in the body
    #[error("Invalid TopicArn")]
    InvalidTopicArn,

    /// Signing certificate URL does not point at the notification service
    #[error("Invalid certificate URL: {0}")]
    InvalidCertificateUrl(String),

    /// Signing certificate could not be retrieved
    #[error("Error retrieving certificate: {0}")]
    CertificateFetch(String),

    /// Notification signature does not verify against the certificate
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Low-level cryptographic failure (certificate parsing, key extraction, verifier errors)
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Login with Amazon rejected the access token
    #[error("Login with Amazon error: {0}")]
    LoginError(String),
}

/// Result type alias for Amazon Pay operations.
pub type Result<T> = std::result::Result<T, AmazonPayError>;

impl From<openssl::error::ErrorStack> for AmazonPayError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        AmazonPayError::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AmazonPayError::InvalidRegion("zz".to_string());
        assert_eq!(err.to_string(), "Invalid region code (zz)");

        let err = AmazonPayError::InvalidTopicArn;
        assert_eq!(err.to_string(), "Invalid TopicArn");
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: AmazonPayError = json_err.into();
        assert!(matches!(err, AmazonPayError::JsonError(_)));

        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: AmazonPayError = url_err.into();
        assert!(matches!(err, AmazonPayError::UrlParseError(_)));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        assert_eq!(returns_result().unwrap(), 42);
    }
}
