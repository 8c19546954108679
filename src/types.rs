//! Core type definitions for the Amazon Pay API.
//!
//! This module contains the flat parameter map that every API call is built from,
//! the list of API actions, and the serde shapes of an inbound notification.

use crate::errors::{AmazonPayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Version of the Off-Amazon Payments API this crate speaks.
pub const API_VERSION: &str = "2013-01-01";

/// Flat parameter map for one API call.
///
/// Keys are unique and kept in byte order, which is the order the signing scheme
/// requires. Values may be given as anything implementing `ToString`, so numbers and
/// booleans can be inserted directly.
///
/// # Examples
///
/// ```
/// use amazon_pay::types::{Action, Params};
///
/// let mut params = Params::with_action(Action::Authorize);
/// params.insert("TransactionTimeout", 1440);
/// params.insert("CaptureNow", false);
///
/// assert_eq!(params.get("Action"), Some("Authorize"));
/// assert_eq!(params.get("CaptureNow"), Some("false"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parameter map with the `Action` key already set.
    pub fn with_action(action: Action) -> Self {
        let mut params = Self::new();
        params.insert("Action", action);
        params
    }

    /// Inserts a value, replacing and returning any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.0.insert(key.into(), value.to_string())
    }

    /// Inserts `value` only when it is `Some`.
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Expands a list into numbered keys: `prefix.1`, `prefix.2`, ...
    ///
    /// ```
    /// use amazon_pay::types::Params;
    ///
    /// let mut params = Params::new();
    /// params.enumerate("OrderReferenceStatusListFilter.OrderReferenceStatus", &["Open", "Closed"]);
    /// assert_eq!(params.get("OrderReferenceStatusListFilter.OrderReferenceStatus.2"), Some("Closed"));
    /// ```
    pub fn enumerate<S: AsRef<str>>(&mut self, prefix: &str, values: &[S]) {
        let prefix = prefix.trim_end_matches('.');
        for (index, value) in values.iter().enumerate() {
            self.insert(format!("{}.{}", prefix, index + 1), value.as_ref());
        }
    }

    /// Returns the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        params.extend(iter);
        params
    }
}

impl<K: Into<String>, V: ToString> Extend<(K, V)> for Params {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Every action exposed by the Off-Amazon Payments API section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Action {
    CreateOrderReferenceForId,
    GetBillingAgreementDetails,
    SetBillingAgreementDetails,
    ConfirmBillingAgreement,
    ValidateBillingAgreement,
    AuthorizeOnBillingAgreement,
    CloseBillingAgreement,
    SetOrderReferenceDetails,
    SetOrderAttributes,
    GetOrderReferenceDetails,
    ConfirmOrderReference,
    CancelOrderReference,
    CloseOrderReference,
    ListOrderReference,
    ListOrderReferenceByNextToken,
    Authorize,
    GetAuthorizationDetails,
    Capture,
    GetCaptureDetails,
    CloseAuthorization,
    Refund,
    GetRefundDetails,
    GetServiceStatus,
}

impl Action {
    /// All actions, in API documentation order.
    pub const ALL: [Action; 23] = [
        Action::CreateOrderReferenceForId,
        Action::GetBillingAgreementDetails,
        Action::SetBillingAgreementDetails,
        Action::ConfirmBillingAgreement,
        Action::ValidateBillingAgreement,
        Action::AuthorizeOnBillingAgreement,
        Action::CloseBillingAgreement,
        Action::SetOrderReferenceDetails,
        Action::SetOrderAttributes,
        Action::GetOrderReferenceDetails,
        Action::ConfirmOrderReference,
        Action::CancelOrderReference,
        Action::CloseOrderReference,
        Action::ListOrderReference,
        Action::ListOrderReferenceByNextToken,
        Action::Authorize,
        Action::GetAuthorizationDetails,
        Action::Capture,
        Action::GetCaptureDetails,
        Action::CloseAuthorization,
        Action::Refund,
        Action::GetRefundDetails,
        Action::GetServiceStatus,
    ];

    /// Wire name of the action, as sent in the `Action` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateOrderReferenceForId => "CreateOrderReferenceForId",
            Action::GetBillingAgreementDetails => "GetBillingAgreementDetails",
            Action::SetBillingAgreementDetails => "SetBillingAgreementDetails",
            Action::ConfirmBillingAgreement => "ConfirmBillingAgreement",
            Action::ValidateBillingAgreement => "ValidateBillingAgreement",
            Action::AuthorizeOnBillingAgreement => "AuthorizeOnBillingAgreement",
            Action::CloseBillingAgreement => "CloseBillingAgreement",
            Action::SetOrderReferenceDetails => "SetOrderReferenceDetails",
            Action::SetOrderAttributes => "SetOrderAttributes",
            Action::GetOrderReferenceDetails => "GetOrderReferenceDetails",
            Action::ConfirmOrderReference => "ConfirmOrderReference",
            Action::CancelOrderReference => "CancelOrderReference",
            Action::CloseOrderReference => "CloseOrderReference",
            Action::ListOrderReference => "ListOrderReference",
            Action::ListOrderReferenceByNextToken => "ListOrderReferenceByNextToken",
            Action::Authorize => "Authorize",
            Action::GetAuthorizationDetails => "GetAuthorizationDetails",
            Action::Capture => "Capture",
            Action::GetCaptureDetails => "GetCaptureDetails",
            Action::CloseAuthorization => "CloseAuthorization",
            Action::Refund => "Refund",
            Action::GetRefundDetails => "GetRefundDetails",
            Action::GetServiceStatus => "GetServiceStatus",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AmazonPayError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AmazonPayError::InvalidParameter(format!("unknown action `{}`", s)))
    }
}

/// Envelope of a push notification as delivered by the notification service.
///
/// The `message` field is itself a JSON document (see [`NotificationMessage`]).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationEnvelope {
    /// Message type, e.g. "Notification"
    #[serde(rename = "Type")]
    pub notification_type: String,

    /// Unique message identifier
    #[serde(rename = "MessageId")]
    pub message_id: String,

    /// Topic the message was published to
    #[serde(rename = "TopicArn")]
    pub topic_arn: String,

    /// Embedded message, a JSON string
    #[serde(rename = "Message")]
    pub message: String,

    /// Publication timestamp
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    /// Base64 signature over the canonical signing string
    #[serde(rename = "Signature")]
    pub signature: String,

    /// Signature scheme version ("1" = SHA1, "2" = SHA256)
    #[serde(rename = "SignatureVersion", skip_serializing_if = "Option::is_none", default)]
    pub signature_version: Option<String>,

    /// URL of the PEM certificate used to sign the message
    #[serde(rename = "SigningCertURL")]
    pub signing_cert_url: String,

    /// URL to unsubscribe from the topic
    #[serde(rename = "UnsubscribeURL", skip_serializing_if = "Option::is_none", default)]
    pub unsubscribe_url: Option<String>,
}

/// Amazon Pay payload embedded in a notification envelope.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationMessage {
    /// Unique notification reference
    #[serde(rename = "NotificationReferenceId", default)]
    pub notification_reference_id: Option<String>,

    /// Marketplace the notification belongs to
    #[serde(rename = "MarketplaceID", default)]
    pub marketplace_id: Option<String>,

    /// Kind of payment object, e.g. "OrderReferenceNotification"
    #[serde(rename = "NotificationType", default)]
    pub notification_type: Option<String>,

    /// True for sample notifications sent from Seller Central
    #[serde(rename = "IsSample", default)]
    pub is_sample: Option<bool>,

    /// Seller the notification is addressed to
    #[serde(rename = "SellerId", default)]
    pub seller_id: Option<String>,

    /// "Sandbox" or "Live"
    #[serde(rename = "ReleaseEnvironment", default)]
    pub release_environment: Option<String>,

    /// Notification schema version
    #[serde(rename = "Version", default)]
    pub version: Option<String>,

    /// XML document describing the payment object
    #[serde(rename = "NotificationData", default)]
    pub notification_data: Option<String>,

    /// Notification timestamp
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_sorted_regardless_of_insertion_order() {
        let a: Params = vec![("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        let b: Params = vec![("c", "3"), ("b", "2"), ("a", "1")].into_iter().collect();

        assert_eq!(a, b);
        let keys: Vec<_> = a.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_params_single_action_key() {
        let mut params = Params::with_action(Action::Capture);
        params.insert("Action", Action::Refund);

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("Action"), Some("Refund"));
    }

    #[test]
    fn test_enumerate_strips_trailing_dot() {
        let mut params = Params::new();
        params.enumerate("Categories.Category.", &["Antiques", "Outdoor"]);

        assert_eq!(params.get("Categories.Category.1"), Some("Antiques"));
        assert_eq!(params.get("Categories.Category.2"), Some("Outdoor"));
        assert!(!params.contains_key("Categories.Category..1"));
    }

    #[test]
    fn test_action_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("Teleport".parse::<Action>().is_err());
    }

    #[test]
    fn test_envelope_deserialization() {
        let json = r#"{
            "Type": "Notification",
            "MessageId": "id-1",
            "TopicArn": "arn:aws:sns:us-east-1:1:topic",
            "Message": "{}",
            "Timestamp": "2015-04-30T00:06:49.434Z",
            "SignatureVersion": "1",
            "Signature": "c2ln",
            "SigningCertURL": "https://sns.us-east-1.amazonaws.com/cert.pem"
        }"#;

        let envelope: NotificationEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.notification_type, "Notification");
        assert_eq!(envelope.signature_version.as_deref(), Some("1"));
        assert!(envelope.unsubscribe_url.is_none());
    }

    #[test]
    fn test_envelope_missing_field_fails() {
        let json = r#"{"Type": "Notification", "MessageId": "id-1"}"#;
        assert!(serde_json::from_str::<NotificationEnvelope>(json).is_err());
    }
}
