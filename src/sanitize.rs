//! Redaction of buyer data before it reaches the logs.
//!
//! These helpers only ever touch text that is about to be logged. Signing and
//! signature verification always work on the untouched payload.

use regex::Regex;
use std::sync::OnceLock;

/// Free-text note parameters that may carry buyer or seller personal data.
const NOTE_PARAMETERS: [&str; 4] = [
    "SellerNote",
    "SellerAuthorizationNote",
    "SellerCaptureNote",
    "SellerRefundNote",
];

/// Response elements whose whole content is masked.
const RESPONSE_ELEMENTS: [&str; 8] = [
    "Buyer",
    "PhysicalDestination",
    "BillingAddress",
    "SellerNote",
    "AuthorizationBillingAddress",
    "SellerAuthorizationNote",
    "SellerCaptureNote",
    "SellerRefundNote",
];

/// Notification elements whose whole content is masked.
const NOTIFICATION_ELEMENTS: [&str; 5] = [
    "SellerNote",
    "AuthorizationBillingAddress",
    "SellerAuthorizationNote",
    "SellerCaptureNote",
    "SellerRefundNote",
];

const REMOVED: &str = "REMOVED";

fn query_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        NOTE_PARAMETERS
            .iter()
            .map(|name| {
                Regex::new(&format!(r"({}=)[^&]*", regex::escape(name)))
                    .expect("static redaction pattern")
            })
            .collect()
    })
}

fn element_patterns(names: &[&str]) -> Vec<Regex> {
    names
        .iter()
        .map(|name| {
            let name = regex::escape(name);
            Regex::new(&format!(r"(?s)(<{0}>).*?(</{0}>)", name))
                .expect("static redaction pattern")
        })
        .collect()
}

fn redact_elements(text: &str, patterns: &[Regex]) -> String {
    patterns.iter().fold(text.to_string(), |acc, pattern| {
        pattern
            .replace_all(&acc, format!("${{1}} {} ${{2}}", REMOVED).as_str())
            .into_owned()
    })
}

/// Masks note parameters in a form-encoded request body.
///
/// # Examples
///
/// ```
/// use amazon_pay::sanitize::sanitize_request_data;
///
/// let body = "Action=Capture&SellerCaptureNote=Gift%20for%20Ann&SellerId=A1";
/// assert_eq!(
///     sanitize_request_data(body),
///     "Action=Capture&SellerCaptureNote=REMOVED&SellerId=A1"
/// );
/// ```
pub fn sanitize_request_data(text: &str) -> String {
    query_patterns().iter().fold(text.to_string(), |acc, pattern| {
        pattern
            .replace_all(&acc, format!("${{1}}{}", REMOVED).as_str())
            .into_owned()
    })
}

/// Masks buyer, address and note elements in an API response document.
///
/// # Examples
///
/// ```
/// use amazon_pay::sanitize::sanitize_response_data;
///
/// let xml = "<Buyer><Name>Ann</Name></Buyer><State>Open</State>";
/// assert_eq!(
///     sanitize_response_data(xml),
///     "<Buyer> REMOVED </Buyer><State>Open</State>"
/// );
/// ```
pub fn sanitize_response_data(text: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    redact_elements(text, PATTERNS.get_or_init(|| element_patterns(&RESPONSE_ELEMENTS)))
}

/// Masks address and note elements in a notification payload.
pub fn sanitize_notification_data(text: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    redact_elements(
        text,
        PATTERNS.get_or_init(|| element_patterns(&NOTIFICATION_ELEMENTS)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_notes_removed() {
        let body = "OrderReferenceAttributes.SellerNote=call%20me&SellerRefundNote=sorry&Action=Refund";
        let clean = sanitize_request_data(body);
        assert_eq!(
            clean,
            "OrderReferenceAttributes.SellerNote=REMOVED&SellerRefundNote=REMOVED&Action=Refund"
        );
    }

    #[test]
    fn test_request_without_notes_untouched() {
        let body = "Action=GetServiceStatus&SellerId=A1";
        assert_eq!(sanitize_request_data(body), body);
    }

    #[test]
    fn test_response_multiline_address_removed() {
        let xml = "<Root>\n<PhysicalDestination>\n  <Name>Ann</Name>\n  <City>Seattle</City>\n</PhysicalDestination>\n<RequestId>r1</RequestId>\n</Root>";
        let clean = sanitize_response_data(xml);
        assert!(!clean.contains("Seattle"));
        assert!(clean.contains("<PhysicalDestination> REMOVED </PhysicalDestination>"));
        assert!(clean.contains("<RequestId>r1</RequestId>"));
    }

    #[test]
    fn test_repeated_elements_redacted_independently() {
        let xml = "<SellerNote>a</SellerNote><Keep>x</Keep><SellerNote>b</SellerNote>";
        assert_eq!(
            sanitize_response_data(xml),
            "<SellerNote> REMOVED </SellerNote><Keep>x</Keep><SellerNote> REMOVED </SellerNote>"
        );
    }

    #[test]
    fn test_notification_keeps_buyer_block() {
        let xml = "<Buyer>b</Buyer><SellerCaptureNote>n</SellerCaptureNote>";
        assert_eq!(
            sanitize_notification_data(xml),
            "<Buyer>b</Buyer><SellerCaptureNote> REMOVED </SellerCaptureNote>"
        );
    }
}
