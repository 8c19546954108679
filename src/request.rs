//! Signed request pipeline.
//!
//! A [`PaymentRequest`] turns a flat parameter map into a signed form POST, sends it
//! and classifies the HTTP outcome. Throttled calls (HTTP 500/503) are retried on
//! the client's [`RetryPolicy`](crate::config::RetryPolicy); every other outcome ends
//! the call.

use crate::config::ClientConfig;
use crate::errors::{AmazonPayError, Result};
use crate::response::PaymentResponse;
use crate::sanitize::{sanitize_request_data, sanitize_response_data};
use crate::signer::{self, canonical_query, encode_component, SIGNATURE_METHOD, SIGNATURE_VERSION};
use crate::types::{Params, API_VERSION};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// `Timestamp` format: ISO-8601, whole seconds, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parameters plus authentication fields, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Every parameter covered by the signature
    pub params: Params,

    /// Base64 HMAC-SHA256 signature
    pub signature: String,
}

impl SignedEnvelope {
    /// Form-encoded body with `Signature` as the last field.
    pub fn to_body(&self) -> String {
        format!(
            "{}&Signature={}",
            canonical_query(&self.params),
            encode_component(&self.signature)
        )
    }
}

/// One logical API call.
#[derive(Debug)]
pub struct PaymentRequest<'a> {
    http: &'a Client,
    config: &'a ClientConfig,
    endpoint: &'a Url,
    headers: &'a HeaderMap,
    params: Params,
}

#[derive(Debug)]
enum Outcome {
    Done(PaymentResponse),
    Throttled(PaymentResponse),
}

impl<'a> PaymentRequest<'a> {
    /// Creates a request against `endpoint`.
    pub fn new(
        http: &'a Client,
        config: &'a ClientConfig,
        endpoint: &'a Url,
        headers: &'a HeaderMap,
        params: Params,
    ) -> Self {
        Self {
            http,
            config,
            endpoint,
            headers,
            params,
        }
    }

    /// Caller parameters of this request, before authentication fields are added.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Adds the authentication fields and signs the result.
    ///
    /// `SellerId` defaults to the configured merchant id; a caller-supplied value wins.
    pub fn envelope(&self, timestamp: DateTime<Utc>) -> Result<SignedEnvelope> {
        let mut params = self.params.clone();
        params.remove("Signature");
        params.insert("AWSAccessKeyId", &self.config.access_key);
        params.insert("SignatureMethod", SIGNATURE_METHOD);
        params.insert("SignatureVersion", SIGNATURE_VERSION);
        params.insert("Version", API_VERSION);
        params.insert("Timestamp", timestamp.format(TIMESTAMP_FORMAT));
        if !params.contains_key("SellerId") {
            params.insert("SellerId", &self.config.merchant_id);
        }

        let host = signing_host(self.endpoint)?;
        let signature =
            signer::sign_params(&self.config.secret_key, &host, self.endpoint.path(), &params);

        Ok(SignedEnvelope { params, signature })
    }

    /// Sends the request, retrying while the API throttles.
    ///
    /// Transport errors end the call immediately. When the retry budget runs out the
    /// last throttled response is returned.
    #[tracing::instrument(
        name = "send_post",
        skip(self),
        fields(action = self.params.get("Action").unwrap_or_default(), endpoint = %self.endpoint)
    )]
    pub async fn send_post(&self) -> Result<PaymentResponse> {
        let single = [Duration::ZERO];
        let delays = if self.config.handle_throttle {
            self.config.retry_policy.delays()
        } else {
            &single[..]
        };

        let mut last = None;
        for (attempt, delay) in delays.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }

            match self.attempt().await? {
                Outcome::Done(response) => return Ok(response),
                Outcome::Throttled(response) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = delays.len(),
                        status = ?response.status_code(),
                        "request throttled"
                    );
                    last = Some(response);
                }
            }
        }

        last.ok_or_else(|| AmazonPayError::ConfigError("retry policy allows no attempts".into()))
    }

    async fn attempt(&self) -> Result<Outcome> {
        let body = self.envelope(Utc::now())?.to_body();
        tracing::debug!(body = %sanitize_request_data(&body), "sending request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        classify(status, text, self.config.handle_throttle)
    }
}

fn classify(status: StatusCode, body: String, handle_throttle: bool) -> Result<Outcome> {
    let code = status.as_u16();

    if status == StatusCode::OK {
        tracing::debug!(status = code, response = %sanitize_response_data(&body), "response received");
        return Ok(Outcome::Done(PaymentResponse::parse(body)?.with_status_code(code)));
    }

    if handle_throttle
        && matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE
        )
    {
        return Ok(Outcome::Throttled(PaymentResponse::throttled(code)?));
    }

    tracing::debug!(status = code, response = %sanitize_response_data(&body), "error response received");
    Ok(Outcome::Done(
        PaymentResponse::parse_error(body)?.with_status_code(code),
    ))
}

/// Host as it appears in the string to sign, port included when explicit.
fn signing_host(endpoint: &Url) -> Result<String> {
    let host = endpoint
        .host_str()
        .ok_or_else(|| AmazonPayError::ConfigError(format!("endpoint {} has no host", endpoint)))?;

    Ok(match endpoint.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Region;
    use crate::types::Action;
    use chrono::TimeZone;

    fn config() -> ClientConfig {
        ClientConfig::new("AKID", "secret", "A2SELLER", Region::Na, "USD")
    }

    fn endpoint() -> Url {
        Url::parse("https://mws.amazonservices.com/OffAmazonPayments_Sandbox/2013-01-01").unwrap()
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_envelope_adds_auth_fields() {
        let http = Client::new();
        let config = config();
        let endpoint = endpoint();
        let headers = HeaderMap::new();
        let request = PaymentRequest::new(
            &http,
            &config,
            &endpoint,
            &headers,
            Params::with_action(Action::GetServiceStatus),
        );

        let envelope = request.envelope(timestamp()).unwrap();
        let params = &envelope.params;

        assert_eq!(params.get("AWSAccessKeyId"), Some("AKID"));
        assert_eq!(params.get("SignatureMethod"), Some("HmacSHA256"));
        assert_eq!(params.get("SignatureVersion"), Some("2"));
        assert_eq!(params.get("Version"), Some("2013-01-01"));
        assert_eq!(params.get("Timestamp"), Some("2024-01-02T03:04:05Z"));
        assert_eq!(params.get("SellerId"), Some("A2SELLER"));
        assert!(!params.contains_key("Signature"));
    }

    #[test]
    fn test_envelope_signature_matches_vector() {
        let http = Client::new();
        let config = config();
        let endpoint = endpoint();
        let headers = HeaderMap::new();
        let mut params = Params::with_action(Action::GetServiceStatus);
        params.insert("SellerNote", "Hello world *~");
        let request = PaymentRequest::new(&http, &config, &endpoint, &headers, params);

        let envelope = request.envelope(timestamp()).unwrap();
        assert_eq!(
            envelope.signature,
            "eLBjWCv1qmXuwaebXh56y99v+k/cGeqjZGejzQJ7mks="
        );
    }

    #[test]
    fn test_caller_seller_id_is_kept() {
        let http = Client::new();
        let config = config();
        let endpoint = endpoint();
        let headers = HeaderMap::new();
        let mut params = Params::with_action(Action::GetServiceStatus);
        params.insert("SellerId", "MARKETPLACE_SELLER");
        let request = PaymentRequest::new(&http, &config, &endpoint, &headers, params);

        let envelope = request.envelope(timestamp()).unwrap();
        assert_eq!(envelope.params.get("SellerId"), Some("MARKETPLACE_SELLER"));
    }

    #[test]
    fn test_body_ends_with_signature() {
        let http = Client::new();
        let config = config();
        let endpoint = endpoint();
        let headers = HeaderMap::new();
        let request = PaymentRequest::new(
            &http,
            &config,
            &endpoint,
            &headers,
            Params::with_action(Action::GetServiceStatus),
        );

        let body = request.envelope(timestamp()).unwrap().to_body();
        let last = body.rsplit('&').next().unwrap();
        assert!(last.starts_with("Signature="));
        assert_eq!(body.matches("Signature=").count(), 1);
        assert!(body.starts_with("AWSAccessKeyId=AKID&Action=GetServiceStatus&"));
    }

    #[test]
    fn test_signing_host_keeps_port() {
        let url = Url::parse("http://127.0.0.1:8080/OffAmazonPayments/2013-01-01").unwrap();
        assert_eq!(signing_host(&url).unwrap(), "127.0.0.1:8080");
        assert_eq!(signing_host(&endpoint()).unwrap(), "mws.amazonservices.com");
    }

    #[test]
    fn test_classify_success() {
        let outcome = classify(StatusCode::OK, "<R><RequestId>x</RequestId></R>".into(), true).unwrap();
        match outcome {
            Outcome::Done(response) => {
                assert!(response.success());
                assert_eq!(response.status_code(), Some(200));
            }
            Outcome::Throttled(_) => panic!("200 must not be throttled"),
        }
    }

    #[test]
    fn test_classify_throttled_only_when_enabled() {
        for status in [StatusCode::INTERNAL_SERVER_ERROR, StatusCode::SERVICE_UNAVAILABLE] {
            let outcome = classify(status, "<ignored/>".into(), true).unwrap();
            assert!(matches!(outcome, Outcome::Throttled(_)));

            let outcome = classify(status, "<ErrorResponse/>".into(), false).unwrap();
            match outcome {
                Outcome::Done(response) => {
                    assert!(!response.success());
                    assert_eq!(response.response_type(), "ErrorResponse");
                }
                Outcome::Throttled(_) => panic!("throttle handling is disabled"),
            }
        }
    }

    #[test]
    fn test_classify_other_error_keeps_body() {
        let body = "<ErrorResponse><Error><Code>InvalidOrderReferenceId</Code></Error></ErrorResponse>";
        let outcome = classify(StatusCode::BAD_REQUEST, body.into(), true).unwrap();
        match outcome {
            Outcome::Done(response) => {
                assert!(!response.success());
                assert_eq!(response.status_code(), Some(400));
                assert_eq!(response.to_xml(), body);
            }
            Outcome::Throttled(_) => panic!("400 is not a throttle signal"),
        }
    }
}
