//! Instant payment notification (IPN) authentication.
//!
//! Notifications are pushed by the notification service as a signed JSON envelope.
//! [`IpnHandler::authenticate`] runs four checks in order and stops at the first
//! failure:
//!
//! 1. the topic ARN header matches the topic ARN in the body
//! 2. the signing certificate URL points at the notification service
//! 3. the certificate can be fetched
//! 4. the signature verifies against the certificate
//!
//! Only then should the embedded payload be acted on. The HTTP endpoint receiving
//! notifications should answer 200 straight away whatever the outcome; failed
//! deliveries are redelivered by the sender, never re-verified here.

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::errors::{AmazonPayError, Result};
use crate::response::PaymentResponse;
use crate::sanitize::sanitize_notification_data;
use crate::types::{NotificationEnvelope, NotificationMessage};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

/// Header carrying the topic ARN of a pushed notification.
pub const TOPIC_ARN_HEADER: &str = "x-amz-sns-topic-arn";

/// Source of signing certificates.
///
/// The default implementation downloads the certificate over HTTPS. Tests and
/// applications caching certificates can supply their own.
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    /// Returns the PEM encoded certificate at `url`.
    ///
    /// Failures should be reported as [`AmazonPayError::CertificateFetch`].
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// Downloads certificates with reqwest.
#[derive(Debug, Clone)]
pub struct HttpCertificateFetcher {
    http: Client,
}

impl HttpCertificateFetcher {
    /// Uses an existing HTTP client.
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Fetcher giving up after `timeout` per download.
    ///
    /// Redirects are not followed, so the download never leaves the validated host.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;
        Ok(Self::new(http))
    }
}

#[async_trait]
impl CertificateFetcher for HttpCertificateFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AmazonPayError::CertificateFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AmazonPayError::CertificateFetch(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| AmazonPayError::CertificateFetch(e.to_string()))
    }
}

/// One received notification.
///
/// # Examples
///
/// ```no_run
/// use amazon_pay::ipn::IpnHandler;
/// use reqwest::header::HeaderMap;
///
/// # async fn example(body: Vec<u8>, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let mut handler = IpnHandler::new(&body, &headers)?;
///
/// if handler.authenticate().await.is_ok() {
///     println!("{}", handler.to_json()?);
/// } else {
///     eprintln!("rejected: {:?}", handler.error());
/// }
/// # Ok(())
/// # }
/// ```
pub struct IpnHandler {
    envelope: NotificationEnvelope,
    message: NotificationMessage,
    header_topic_arn: Option<String>,
    xml: String,
    fetcher: Arc<dyn CertificateFetcher>,
    error: Option<String>,
}

impl IpnHandler {
    /// Parses the envelope and its embedded message.
    ///
    /// Nothing is trusted yet; call [`authenticate`](Self::authenticate) before using
    /// the payload.
    pub fn new(body: &[u8], headers: &HeaderMap) -> Result<Self> {
        let envelope: NotificationEnvelope = serde_json::from_slice(body)?;
        let message: NotificationMessage = serde_json::from_str(&envelope.message)?;
        let data = message
            .notification_data
            .as_deref()
            .ok_or_else(|| AmazonPayError::MissingField("NotificationData".into()))?;
        let xml = strip_xml_declaration(data).to_string();

        let header_topic_arn = headers
            .get(TOPIC_ARN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            message_id = %envelope.message_id,
            notification = %sanitize_notification_data(&xml),
            "notification received"
        );

        Ok(Self {
            envelope,
            message,
            header_topic_arn,
            xml,
            fetcher: Arc::new(HttpCertificateFetcher::with_timeout(DEFAULT_REQUEST_TIMEOUT)?),
            error: None,
        })
    }

    /// Replaces the certificate source.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn CertificateFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Runs the four authentication steps.
    ///
    /// Returns `Ok(true)` when every step passed. On failure the error is returned
    /// and its description is kept for [`error`](Self::error).
    #[tracing::instrument(skip(self), fields(message_id = %self.envelope.message_id))]
    pub async fn authenticate(&mut self) -> Result<bool> {
        match self.verify().await {
            Ok(()) => {
                self.error = None;
                tracing::debug!("notification authenticated");
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(error = %err, "notification rejected");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn verify(&self) -> Result<()> {
        self.validate_header()?;
        let cert_url = validate_cert_url(&self.envelope.signing_cert_url)?;
        let pem = self.fetcher.fetch(&cert_url).await?;
        self.validate_signature(&pem)
    }

    fn validate_header(&self) -> Result<()> {
        match self.header_topic_arn.as_deref() {
            Some(topic_arn) if topic_arn == self.envelope.topic_arn => Ok(()),
            _ => Err(AmazonPayError::InvalidTopicArn),
        }
    }

    fn validate_signature(&self, pem: &str) -> Result<()> {
        let digest = match self.envelope.signature_version.as_deref() {
            None | Some("1") => MessageDigest::sha1(),
            Some("2") => MessageDigest::sha256(),
            Some(other) => {
                return Err(AmazonPayError::InvalidSignature(format!(
                    "unsupported SignatureVersion {}",
                    other
                )))
            }
        };

        let signature = BASE64
            .decode(self.envelope.signature.as_bytes())
            .map_err(|e| AmazonPayError::InvalidSignature(format!("malformed signature: {}", e)))?;

        let certificate = X509::from_pem(pem.as_bytes())?;
        let public_key = certificate.public_key()?;
        let mut verifier = Verifier::new(digest, &public_key)?;
        verifier.update(self.signing_string().as_bytes())?;

        if verifier.verify(&signature)? {
            Ok(())
        } else {
            Err(AmazonPayError::InvalidSignature(
                "signature does not match the signing certificate".into(),
            ))
        }
    }

    /// Canonical string the notification service signs.
    pub fn signing_string(&self) -> String {
        let envelope = &self.envelope;
        [
            ("Message", &envelope.message),
            ("MessageId", &envelope.message_id),
            ("Timestamp", &envelope.timestamp),
            ("TopicArn", &envelope.topic_arn),
            ("Type", &envelope.notification_type),
        ]
        .iter()
        .map(|(name, value)| format!("{}\n{}\n", name, value))
        .collect()
    }

    /// Description of the last authentication failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Parsed envelope.
    pub fn envelope(&self) -> &NotificationEnvelope {
        &self.envelope
    }

    /// Parsed embedded message.
    pub fn message(&self) -> &NotificationMessage {
        &self.message
    }

    /// Kind of payment object the notification is about.
    pub fn notification_type(&self) -> Option<&str> {
        self.message.notification_type.as_deref()
    }

    /// Notification payload without its XML declaration.
    pub fn to_xml(&self) -> &str {
        &self.xml
    }

    /// Notification payload as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(self.to_response()?.to_json())
    }

    /// Notification payload run through the response parser.
    pub fn to_response(&self) -> Result<PaymentResponse> {
        PaymentResponse::parse(self.xml.clone())
    }
}

impl fmt::Debug for IpnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpnHandler")
            .field("message_id", &self.envelope.message_id)
            .field("topic_arn", &self.envelope.topic_arn)
            .field("notification_type", &self.message.notification_type)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

fn cert_host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^sns\.[a-zA-Z0-9\-]{3,}\.amazonaws\.com(\.cn)?$")
            .expect("static certificate host pattern")
    })
}

fn cert_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^/.+\.pem$").expect("static certificate path pattern"))
}

/// Checks that a signing certificate URL points at the notification service.
///
/// # Examples
///
/// ```
/// use amazon_pay::ipn::validate_cert_url;
///
/// assert!(validate_cert_url("https://sns.eu-west-1.amazonaws.com/cert.pem").is_ok());
/// assert!(validate_cert_url("https://sns.cn-north-1.amazonaws.com.cn/cert.pem").is_ok());
/// assert!(validate_cert_url("http://sns.eu-west-1.amazonaws.com/cert.pem").is_err());
/// assert!(validate_cert_url("https://sns.eu-west-1.amazonaws.com.evil.com/cert.pem").is_err());
/// ```
pub fn validate_cert_url(cert_url: &str) -> Result<Url> {
    let invalid = |reason: &str| {
        AmazonPayError::InvalidCertificateUrl(format!("{} ({})", cert_url, reason))
    };

    let url = Url::parse(cert_url).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "https" {
        return Err(invalid("scheme must be https"));
    }
    if !url.username().is_empty() || url.password().is_some() || url.port().is_some() {
        return Err(invalid("unexpected authority"));
    }
    if !cert_host_pattern().is_match(url.host_str().unwrap_or_default()) {
        return Err(invalid("host is not the notification service"));
    }
    if !cert_path_pattern().is_match(url.path()) {
        return Err(invalid("path is not a .pem file"));
    }

    Ok(url)
}

fn strip_xml_declaration(data: &str) -> &str {
    let trimmed = data.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    const TOPIC: &str = "arn:aws:sns:us-east-1:291180941288:A3BXB0YN3XH17HAQR8184NJXADU";

    fn body(cert_url: &str, data: &str) -> Vec<u8> {
        let message = json!({
            "NotificationType": "PaymentCapture",
            "SellerId": "AQR8184NJXADU",
            "NotificationData": data,
        });
        serde_json::to_vec(&json!({
            "Type": "Notification",
            "MessageId": "m-1",
            "TopicArn": TOPIC,
            "Message": message.to_string(),
            "Timestamp": "2015-04-30T00:06:49.434Z",
            "Signature": "c2lnbmF0dXJl",
            "SigningCertURL": cert_url,
        }))
        .unwrap()
    }

    fn headers(topic: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-Amz-Sns-Topic-Arn", HeaderValue::from_str(topic).unwrap());
        headers
    }

    #[test]
    fn test_cert_url_rules() {
        for good in [
            "https://sns.us-east-1.amazonaws.com/SimpleNotificationService-abc.pem",
            "https://sns.cn-north-1.amazonaws.com.cn/SimpleNotificationService-abc.pem",
        ] {
            assert!(validate_cert_url(good).is_ok(), "rejected {}", good);
        }

        for bad in [
            "not a url",
            "http://sns.us-east-1.amazonaws.com/cert.pem",
            "https://invalid.us-east-1.amazonaws.com/cert.pem",
            "https://sns.us.amazonaws.com/cert.pem",
            "https://sns.us-east-1.amazonaws.com.attacker.net/cert.pem",
            "https://sns.us-east-1.amazonaws.com:8443/cert.pem",
            "https://user@sns.us-east-1.amazonaws.com/cert.pem",
            "https://sns.us-east-1.amazonaws.com/cert.txt",
            "https://sns.us-east-1.amazonaws.com/.pem",
        ] {
            assert!(
                matches!(validate_cert_url(bad), Err(AmazonPayError::InvalidCertificateUrl(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_declaration_stripped() {
        let data = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<CaptureNotification><State>Completed</State></CaptureNotification>";
        let handler = IpnHandler::new(
            &body("https://sns.us-east-1.amazonaws.com/c.pem", data),
            &headers(TOPIC),
        )
        .unwrap();

        assert!(handler.to_xml().starts_with("<CaptureNotification>"));
        assert_eq!(handler.notification_type(), Some("PaymentCapture"));
        assert_eq!(
            handler.to_json().unwrap(),
            r#"{"CaptureNotification":{"State":"Completed"}}"#
        );
    }

    #[test]
    fn test_signing_string_layout() {
        let handler = IpnHandler::new(
            &body("https://sns.us-east-1.amazonaws.com/c.pem", "<A/>"),
            &headers(TOPIC),
        )
        .unwrap();

        let signing_string = handler.signing_string();
        let lines: Vec<&str> = signing_string.split('\n').collect();
        assert_eq!(lines[0], "Message");
        assert_eq!(lines[2], "MessageId");
        assert_eq!(lines[3], "m-1");
        assert_eq!(lines[4], "Timestamp");
        assert_eq!(lines[6], "TopicArn");
        assert_eq!(lines[7], TOPIC);
        assert_eq!(lines[8], "Type");
        assert_eq!(lines[9], "Notification");
        assert!(signing_string.ends_with("Notification\n"));
    }

    #[test]
    fn test_missing_notification_data() {
        let body = serde_json::to_vec(&json!({
            "Type": "Notification",
            "MessageId": "m-1",
            "TopicArn": TOPIC,
            "Message": "{}",
            "Timestamp": "t",
            "Signature": "s",
            "SigningCertURL": "https://sns.us-east-1.amazonaws.com/c.pem",
        }))
        .unwrap();

        let err = IpnHandler::new(&body, &headers(TOPIC)).unwrap_err();
        assert!(matches!(err, AmazonPayError::MissingField(field) if field == "NotificationData"));
    }

    #[test]
    fn test_malformed_envelope() {
        let err = IpnHandler::new(b"{\"Type\": \"Notification\"}", &headers(TOPIC)).unwrap_err();
        assert!(matches!(err, AmazonPayError::JsonError(_)));
    }

    #[tokio::test]
    async fn test_missing_header_records_error() {
        let mut handler = IpnHandler::new(
            &body("https://sns.us-east-1.amazonaws.com/c.pem", "<A/>"),
            &HeaderMap::new(),
        )
        .unwrap();

        let err = handler.authenticate().await.unwrap_err();
        assert!(matches!(err, AmazonPayError::InvalidTopicArn));
        assert_eq!(handler.error(), Some("Invalid TopicArn"));
    }
}
