//! Canonical request signing.
//!
//! Requests are signed with HMAC-SHA256 over a four-line string: the HTTP method,
//! the endpoint host, the endpoint path and the sorted, RFC 3986 encoded parameters.

use crate::types::Params;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `SignatureMethod` parameter.
pub const SIGNATURE_METHOD: &str = "HmacSHA256";

/// Value of the `SignatureVersion` parameter.
pub const SIGNATURE_VERSION: &str = "2";

/// Percent-encodes a key or value the way the signing scheme expects.
///
/// Form encoding leaves `*` alone, turns spaces into `+` and escapes `~`; the
/// signing scheme wants `%2A`, `%20` and a bare `~`.
///
/// # Examples
///
/// ```
/// use amazon_pay::signer::encode_component;
///
/// assert_eq!(encode_component("a b*c~d"), "a%20b%2Ac~d");
/// assert_eq!(encode_component("2024-01-02T03:04:05Z"), "2024-01-02T03%3A04%3A05Z");
/// ```
pub fn encode_component(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Encodes the parameters as `key=value` pairs joined by `&`, sorted by key.
///
/// # Examples
///
/// ```
/// use amazon_pay::signer::canonical_query;
/// use amazon_pay::types::Params;
///
/// let params: Params = vec![("b", "x y"), ("a", "1")].into_iter().collect();
/// assert_eq!(canonical_query(&params), "a=1&b=x%20y");
/// ```
pub fn canonical_query(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds the string to sign for a POST to `host` + `path`.
pub fn string_to_sign(host: &str, path: &str, params: &Params) -> String {
    format!("POST\n{}\n{}\n{}", host, path, canonical_query(params))
}

/// Computes `base64(HMAC-SHA256(secret, data))`.
///
/// # Examples
///
/// ```
/// use amazon_pay::signer::sign;
///
/// assert_eq!(
///     sign("mws_secret_key", "my_test_string"),
///     "JQZYxe8EFlLE3XCAWotsn329rpZF7OFYhA8oo7rUV2E="
/// );
/// ```
pub fn sign(secret: &str, data: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take any size key");
    mac.update(data.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Signs a parameter set for a POST to `host` + `path`.
pub fn sign_params(secret: &str, host: &str, path: &str, params: &Params) -> String {
    let string_to_sign = string_to_sign(host, path, params);
    tracing::trace!(%string_to_sign, "computing request signature");
    sign(secret, &string_to_sign)
}
