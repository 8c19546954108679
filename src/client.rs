//! Amazon Pay API client.
//!
//! [`AmazonPayClient`] owns the resolved configuration, the HTTP client and the active
//! endpoint. Every action goes through [`AmazonPayClient::invoke`], which builds the
//! parameter map from the action's field table and hands it to the signed request
//! pipeline. The typed helpers are thin wrappers around it.

use crate::config::ClientConfig;
use crate::errors::{AmazonPayError, Result};
use crate::lwa::LoginWithAmazon;
use crate::operations::{self, FieldContext, Fields};
use crate::request::PaymentRequest;
use crate::response::PaymentResponse;
use crate::types::{Action, Params, API_VERSION};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Content type of every API call.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const ORDER_ID_LIST: [&str; 4] = [
    "GetOrderReferenceDetailsResponse",
    "GetOrderReferenceDetailsResult",
    "OrderReferenceDetails",
    "IdList",
];
const AUTHORIZATION_ID_LIST: [&str; 4] = [
    "GetAuthorizationDetailsResponse",
    "GetAuthorizationDetailsResult",
    "AuthorizationDetails",
    "IdList",
];
const CAPTURE_ID_LIST: [&str; 4] = [
    "GetCaptureDetailsResponse",
    "GetCaptureDetailsResult",
    "CaptureDetails",
    "IdList",
];
const BILLING_AGREEMENT_STATE: [&str; 5] = [
    "GetBillingAgreementDetailsResponse",
    "GetBillingAgreementDetailsResult",
    "BillingAgreementDetails",
    "BillingAgreementStatus",
    "State",
];

/// Kind of object an Amazon reference id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Ids starting with `P` or `S`
    OrderReference,
    /// Ids starting with `B` or `C`
    BillingAgreement,
}

impl ReferenceKind {
    /// Classifies a reference id by its first letter.
    ///
    /// ```
    /// use amazon_pay::client::ReferenceKind;
    ///
    /// assert_eq!(ReferenceKind::of("S01-1234567-1234567"), Some(ReferenceKind::OrderReference));
    /// assert_eq!(ReferenceKind::of("C01-1234567-1234567"), Some(ReferenceKind::BillingAgreement));
    /// assert_eq!(ReferenceKind::of("X01"), None);
    /// ```
    pub fn of(reference_id: &str) -> Option<Self> {
        match reference_id.chars().next() {
            Some('P' | 'S') => Some(ReferenceKind::OrderReference),
            Some('B' | 'C') => Some(ReferenceKind::BillingAgreement),
            _ => None,
        }
    }
}

/// Optional inputs of [`AmazonPayClient::charge`].
#[derive(Debug, Clone, Default)]
pub struct ChargeOptions {
    /// Seller order id (or billing agreement id) shown to the buyer
    pub order_id: Option<String>,
    /// Store name shown to the buyer
    pub store_name: Option<String>,
    /// Free-form data kept with the order
    pub custom_information: Option<String>,
    /// Solution provider id
    pub platform_id: Option<String>,
    /// Statement descriptor
    pub soft_descriptor: Option<String>,
    /// Seller to act for (marketplaces)
    pub merchant_id: Option<String>,
    /// MWS auth token of that seller
    pub mws_auth_token: Option<String>,
}

impl ChargeOptions {
    fn scoped(&self, fields: Fields) -> Fields {
        fields
            .set_opt("merchant_id", self.merchant_id.as_deref())
            .set_opt("mws_auth_token", self.mws_auth_token.as_deref())
    }
}

/// Seller a marketplace acts for in multi-call operations.
///
/// The default scope signs every call as the configured merchant.
#[derive(Debug, Clone, Default)]
pub struct SellerScope {
    /// Seller id sent as `SellerId`
    pub merchant_id: Option<String>,
    /// MWS auth token of that seller
    pub mws_auth_token: Option<String>,
}

impl SellerScope {
    /// Scope acting for `merchant_id` with its auth token.
    pub fn new(merchant_id: impl Into<String>, mws_auth_token: impl Into<String>) -> Self {
        Self {
            merchant_id: Some(merchant_id.into()),
            mws_auth_token: Some(mws_auth_token.into()),
        }
    }

    fn fields(&self) -> Fields {
        Fields::new()
            .set_opt("merchant_id", self.merchant_id.as_deref())
            .set_opt("mws_auth_token", self.mws_auth_token.as_deref())
    }
}

/// Every response of a [`get_payment_details`](AmazonPayClient::get_payment_details)
/// walk plus the lookups that failed along the way.
#[derive(Debug, Default)]
pub struct PaymentDetails {
    /// Order reference first, then authorizations, captures and refunds in walk order
    pub responses: Vec<PaymentResponse>,
    /// Transport or payload errors of individual lookups
    pub errors: Vec<AmazonPayError>,
}

impl PaymentDetails {
    /// True if every lookup completed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Client for the Off-Amazon Payments API.
///
/// # Examples
///
/// ```
/// use amazon_pay::client::AmazonPayClient;
/// use amazon_pay::config::{ClientConfig, Region};
///
/// let config = ClientConfig::new("ACCESS_KEY", "SECRET_KEY", "MERCHANT_ID", Region::Na, "USD")
///     .with_sandbox(true);
/// let mut client = AmazonPayClient::new(config).unwrap();
///
/// assert_eq!(
///     client.endpoint().as_str(),
///     "https://mws.amazonservices.com/OffAmazonPayments_Sandbox/2013-01-01"
/// );
///
/// client.set_sandbox(false);
/// assert_eq!(
///     client.endpoint().as_str(),
///     "https://mws.amazonservices.com/OffAmazonPayments/2013-01-01"
/// );
/// ```
#[derive(Debug)]
pub struct AmazonPayClient {
    config: ClientConfig,
    http: Client,
    headers: HeaderMap,
    endpoint: Url,
}

impl AmazonPayClient {
    /// Validates `config` and builds the client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder().timeout(config.request_timeout).build()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        let user_agent = HeaderValue::from_str(&config.user_agent())
            .map_err(|e| AmazonPayError::ConfigError(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);

        let mut endpoint = match &config.base_url {
            Some(base_url) => base_url.clone(),
            None => Url::parse(&format!("https://{}", config.region.mws_host()))?,
        };
        endpoint.set_path(&endpoint_path(config.sandbox));

        tracing::debug!(%endpoint, region = %config.region, "amazon pay client ready");

        Ok(Self {
            config,
            http,
            headers,
            endpoint,
        })
    }

    /// Resolved configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// True when calls go to the sandbox.
    pub fn sandbox(&self) -> bool {
        self.config.sandbox
    }

    /// Switches between sandbox and live endpoints for all subsequent calls.
    pub fn set_sandbox(&mut self, sandbox: bool) {
        self.config.sandbox = sandbox;
        self.endpoint.set_path(&endpoint_path(sandbox));
    }

    /// Active endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// User agent sent with every call.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
    }

    /// Calls `action` with the given fields.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use amazon_pay::client::AmazonPayClient;
    /// use amazon_pay::config::{ClientConfig, Region};
    /// use amazon_pay::operations::Fields;
    /// use amazon_pay::types::Action;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = AmazonPayClient::new(ClientConfig::from_env()?)?;
    ///
    /// let response = client
    ///     .invoke(
    ///         Action::CloseOrderReference,
    ///         Fields::new()
    ///             .set("amazon_order_reference_id", "S01-1234567-1234567")
    ///             .set("closure_reason", "Order shipped"),
    ///     )
    ///     .await?;
    ///
    /// println!("{}", response.to_json());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn invoke(&self, action: Action, fields: Fields) -> Result<PaymentResponse> {
        let spec = operations::spec_for(action).ok_or_else(|| {
            AmazonPayError::InvalidParameter(format!("no field table for {}", action))
        })?;
        let context = FieldContext {
            currency_code: &self.config.currency_code,
            payment_domain: self.config.region.payment_domain(),
        };
        let params = operations::build_params(spec, &fields, &context)?;
        self.send(params).await
    }

    /// Sends a raw parameter map through the signed request pipeline.
    pub async fn send(&self, params: Params) -> Result<PaymentResponse> {
        PaymentRequest::new(
            &self.http,
            &self.config,
            &self.endpoint,
            &self.headers,
            params,
        )
        .send_post()
        .await
    }

    /// Returns the operational status of the API.
    pub async fn get_service_status(&self) -> Result<PaymentResponse> {
        self.invoke(Action::GetServiceStatus, Fields::new()).await
    }

    /// Sets the amount and seller attributes of an order reference.
    pub async fn set_order_reference_details(
        &self,
        amazon_order_reference_id: &str,
        order_total: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options
            .set("amazon_order_reference_id", amazon_order_reference_id)
            .set("order_total", order_total);
        self.invoke(Action::SetOrderReferenceDetails, fields).await
    }

    /// Returns the details of an order reference.
    pub async fn get_order_reference_details(
        &self,
        amazon_order_reference_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_order_reference_id", amazon_order_reference_id);
        self.invoke(Action::GetOrderReferenceDetails, fields).await
    }

    /// Confirms an order reference.
    pub async fn confirm_order_reference(
        &self,
        amazon_order_reference_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_order_reference_id", amazon_order_reference_id);
        self.invoke(Action::ConfirmOrderReference, fields).await
    }

    /// Closes an order reference.
    pub async fn close_order_reference(
        &self,
        amazon_order_reference_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_order_reference_id", amazon_order_reference_id);
        self.invoke(Action::CloseOrderReference, fields).await
    }

    /// Reserves `authorization_amount` against an order reference.
    pub async fn authorize(
        &self,
        amazon_order_reference_id: &str,
        authorization_reference_id: &str,
        authorization_amount: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options
            .set("amazon_order_reference_id", amazon_order_reference_id)
            .set("authorization_reference_id", authorization_reference_id)
            .set("authorization_amount", authorization_amount);
        self.invoke(Action::Authorize, fields).await
    }

    /// Returns the details of an authorization.
    pub async fn get_authorization_details(
        &self,
        amazon_authorization_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_authorization_id", amazon_authorization_id);
        self.invoke(Action::GetAuthorizationDetails, fields).await
    }

    /// Captures funds from an authorization.
    pub async fn capture(
        &self,
        amazon_authorization_id: &str,
        capture_reference_id: &str,
        capture_amount: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options
            .set("amazon_authorization_id", amazon_authorization_id)
            .set("capture_reference_id", capture_reference_id)
            .set("capture_amount", capture_amount);
        self.invoke(Action::Capture, fields).await
    }

    /// Returns the details of a capture.
    pub async fn get_capture_details(
        &self,
        amazon_capture_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_capture_id", amazon_capture_id);
        self.invoke(Action::GetCaptureDetails, fields).await
    }

    /// Refunds captured funds.
    pub async fn refund(
        &self,
        amazon_capture_id: &str,
        refund_reference_id: &str,
        refund_amount: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options
            .set("amazon_capture_id", amazon_capture_id)
            .set("refund_reference_id", refund_reference_id)
            .set("refund_amount", refund_amount);
        self.invoke(Action::Refund, fields).await
    }

    /// Returns the details of a refund.
    pub async fn get_refund_details(
        &self,
        amazon_refund_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_refund_id", amazon_refund_id);
        self.invoke(Action::GetRefundDetails, fields).await
    }

    /// Returns the details of a billing agreement.
    pub async fn get_billing_agreement_details(
        &self,
        amazon_billing_agreement_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_billing_agreement_id", amazon_billing_agreement_id);
        self.invoke(Action::GetBillingAgreementDetails, fields).await
    }

    /// Sets the seller attributes of a billing agreement.
    pub async fn set_billing_agreement_details(
        &self,
        amazon_billing_agreement_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_billing_agreement_id", amazon_billing_agreement_id);
        self.invoke(Action::SetBillingAgreementDetails, fields).await
    }

    /// Confirms a billing agreement.
    pub async fn confirm_billing_agreement(
        &self,
        amazon_billing_agreement_id: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options.set("amazon_billing_agreement_id", amazon_billing_agreement_id);
        self.invoke(Action::ConfirmBillingAgreement, fields).await
    }

    /// Reserves `authorization_amount` against a billing agreement.
    pub async fn authorize_on_billing_agreement(
        &self,
        amazon_billing_agreement_id: &str,
        authorization_reference_id: &str,
        authorization_amount: &str,
        options: Fields,
    ) -> Result<PaymentResponse> {
        let fields = options
            .set("amazon_billing_agreement_id", amazon_billing_agreement_id)
            .set("authorization_reference_id", authorization_reference_id)
            .set("authorization_amount", authorization_amount);
        self.invoke(Action::AuthorizeOnBillingAgreement, fields).await
    }

    /// Charges an order reference or a billing agreement in one go.
    ///
    /// Order references (`P...`/`S...`) are set, confirmed and authorized with
    /// immediate capture. Billing agreements (`B...`/`C...`) are set and confirmed
    /// only while still in `Draft`, then authorized with immediate capture. The
    /// first unsuccessful response is returned as is.
    #[tracing::instrument(skip(self, note, options))]
    pub async fn charge(
        &self,
        reference_id: &str,
        amount: &str,
        authorization_reference_id: &str,
        note: Option<&str>,
        options: &ChargeOptions,
    ) -> Result<PaymentResponse> {
        match ReferenceKind::of(reference_id) {
            Some(ReferenceKind::OrderReference) => {
                self.charge_order_reference(reference_id, amount, authorization_reference_id, note, options)
                    .await
            }
            Some(ReferenceKind::BillingAgreement) => {
                self.charge_billing_agreement(reference_id, amount, authorization_reference_id, note, options)
                    .await
            }
            None => Err(AmazonPayError::InvalidParameter(format!(
                "`{}` is neither an order reference nor a billing agreement id",
                reference_id
            ))),
        }
    }

    async fn charge_order_reference(
        &self,
        reference_id: &str,
        amount: &str,
        authorization_reference_id: &str,
        note: Option<&str>,
        options: &ChargeOptions,
    ) -> Result<PaymentResponse> {
        let details = options
            .scoped(Fields::new())
            .set_opt("platform_id", options.platform_id.as_deref())
            .set_opt("seller_note", note)
            .set_opt("seller_order_id", options.order_id.as_deref())
            .set_opt("store_name", options.store_name.as_deref())
            .set_opt("custom_information", options.custom_information.as_deref());
        let response = self
            .set_order_reference_details(reference_id, amount, details)
            .await?;
        if !response.success() {
            return Ok(response);
        }

        let response = self
            .confirm_order_reference(reference_id, options.scoped(Fields::new()))
            .await?;
        if !response.success() {
            return Ok(response);
        }

        let authorization = options
            .scoped(Fields::new())
            .set_opt("seller_authorization_note", note)
            .set("transaction_timeout", 0)
            .set("capture_now", true)
            .set_opt("soft_descriptor", options.soft_descriptor.as_deref());
        self.authorize(reference_id, authorization_reference_id, amount, authorization)
            .await
    }

    async fn charge_billing_agreement(
        &self,
        reference_id: &str,
        amount: &str,
        authorization_reference_id: &str,
        note: Option<&str>,
        options: &ChargeOptions,
    ) -> Result<PaymentResponse> {
        let response = self
            .get_billing_agreement_details(reference_id, options.scoped(Fields::new()))
            .await?;
        if !response.success() {
            return Ok(response);
        }

        let state = response
            .get(&BILLING_AGREEMENT_STATE)
            .and_then(Value::as_str);
        if state == Some("Draft") {
            let details = options
                .scoped(Fields::new())
                .set_opt("platform_id", options.platform_id.as_deref())
                .set_opt("seller_note", note)
                .set_opt("seller_billing_agreement_id", options.order_id.as_deref())
                .set_opt("store_name", options.store_name.as_deref())
                .set_opt("custom_information", options.custom_information.as_deref());
            let response = self
                .set_billing_agreement_details(reference_id, details)
                .await?;
            if !response.success() {
                return Ok(response);
            }

            let response = self
                .confirm_billing_agreement(reference_id, options.scoped(Fields::new()))
                .await?;
            if !response.success() {
                return Ok(response);
            }
        }

        let authorization = options
            .scoped(Fields::new())
            .set_opt("seller_authorization_note", note)
            .set("transaction_timeout", 0)
            .set("capture_now", true)
            .set_opt("soft_descriptor", options.soft_descriptor.as_deref())
            .set_opt("seller_note", note)
            .set_opt("platform_id", options.platform_id.as_deref())
            .set_opt("seller_order_id", options.order_id.as_deref())
            .set_opt("store_name", options.store_name.as_deref())
            .set_opt("custom_information", options.custom_information.as_deref())
            .set("inherit_shipping_address", true);
        self.authorize_on_billing_agreement(
            reference_id,
            authorization_reference_id,
            amount,
            authorization,
        )
        .await
    }

    /// Walks an order reference and everything hanging off it.
    ///
    /// The order reference is fetched first; a failure there is returned as an
    /// error. After that each authorization, capture and refund listed in an `IdList`
    /// is fetched in turn. Failed lookups are collected in
    /// [`PaymentDetails::errors`] and the walk carries on with the remaining ids.
    ///
    /// Every lookup of the walk is made on behalf of `scope`.
    #[tracing::instrument(skip(self, scope))]
    pub async fn get_payment_details(
        &self,
        amazon_order_reference_id: &str,
        scope: &SellerScope,
    ) -> Result<PaymentDetails> {
        let order = self
            .get_order_reference_details(amazon_order_reference_id, scope.fields())
            .await?;

        let mut details = PaymentDetails::default();
        let authorization_ids = member_ids(&order, &ORDER_ID_LIST);
        details.responses.push(order);

        for authorization_id in authorization_ids {
            let capture_ids = self
                .collect_details(
                    &mut details,
                    scope,
                    Action::GetAuthorizationDetails,
                    "amazon_authorization_id",
                    &authorization_id,
                    &AUTHORIZATION_ID_LIST,
                )
                .await;

            for capture_id in capture_ids {
                let refund_ids = self
                    .collect_details(
                        &mut details,
                        scope,
                        Action::GetCaptureDetails,
                        "amazon_capture_id",
                        &capture_id,
                        &CAPTURE_ID_LIST,
                    )
                    .await;

                for refund_id in refund_ids {
                    self.collect_details(
                        &mut details,
                        scope,
                        Action::GetRefundDetails,
                        "amazon_refund_id",
                        &refund_id,
                        &[],
                    )
                    .await;
                }
            }
        }

        Ok(details)
    }

    /// Fetches one object into `details` and returns the ids listed under `id_list`.
    async fn collect_details(
        &self,
        details: &mut PaymentDetails,
        scope: &SellerScope,
        action: Action,
        id_field: &str,
        id: &str,
        id_list: &[&str],
    ) -> Vec<String> {
        match self.invoke(action, scope.fields().set(id_field, id)).await {
            Ok(response) => {
                let ids = member_ids(&response, id_list);
                details.responses.push(response);
                ids
            }
            Err(err) => {
                tracing::warn!(%action, id, error = %err, "payment detail lookup failed");
                details.errors.push(err);
                Vec::new()
            }
        }
    }

    /// Returns the Login with Amazon profile of the buyer owning `access_token`.
    pub async fn get_login_profile(&self, access_token: &str, client_id: &str) -> Result<Value> {
        LoginWithAmazon::new(client_id, self.config.region, self.config.sandbox)?
            .with_http_client(self.http.clone())
            .get_login_profile(access_token)
            .await
    }
}

fn endpoint_path(sandbox: bool) -> String {
    let suffix = if sandbox { "_Sandbox" } else { "" };
    format!("/OffAmazonPayments{}/{}", suffix, API_VERSION)
}

/// Ids under `<IdList><member>..</member></IdList>`; one member is a bare string.
fn member_ids(response: &PaymentResponse, id_list: &[&str]) -> Vec<String> {
    if id_list.is_empty() {
        return Vec::new();
    }

    match response.get(id_list).and_then(|list| list.get("member")) {
        Some(Value::String(id)) => vec![id.clone()],
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Region;

    fn config() -> ClientConfig {
        ClientConfig::new("AKID", "secret", "SELLER", Region::De, "EUR")
    }

    #[test]
    fn test_client_creation_validates_config() {
        let err = AmazonPayClient::new(ClientConfig::new("AKID", "", "SELLER", Region::Na, "USD"))
            .unwrap_err();
        assert!(matches!(err, AmazonPayError::ConfigError(_)));
    }

    #[test]
    fn test_regional_endpoint() {
        let client = AmazonPayClient::new(config()).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://mws-eu.amazonservices.com/OffAmazonPayments/2013-01-01"
        );
        assert!(!client.sandbox());
    }

    #[test]
    fn test_sandbox_toggle() {
        let mut client = AmazonPayClient::new(config().with_sandbox(true)).unwrap();
        assert!(client.endpoint().path().starts_with("/OffAmazonPayments_Sandbox/"));

        client.set_sandbox(false);
        assert!(!client.sandbox());
        assert_eq!(client.endpoint().path(), "/OffAmazonPayments/2013-01-01");

        client.set_sandbox(true);
        assert_eq!(client.endpoint().path(), "/OffAmazonPayments_Sandbox/2013-01-01");
    }

    #[test]
    fn test_base_url_override_keeps_port() {
        let base = Url::parse("http://127.0.0.1:9000").unwrap();
        let client = AmazonPayClient::new(config().with_base_url(base)).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://127.0.0.1:9000/OffAmazonPayments/2013-01-01"
        );
    }

    #[test]
    fn test_user_agent_header() {
        let client =
            AmazonPayClient::new(config().with_application("shop", "1.0")).unwrap();
        let ua = client.user_agent().unwrap();
        assert!(ua.starts_with("amazon-pay-sdk-rust/"));
        assert!(ua.contains("shop/1.0"));
    }

    #[test]
    fn test_member_ids_scalar_and_list() {
        let single = PaymentResponse::parse(
            "<GetCaptureDetailsResponse><GetCaptureDetailsResult><CaptureDetails>\
             <IdList><member>R1</member></IdList>\
             </CaptureDetails></GetCaptureDetailsResult></GetCaptureDetailsResponse>",
        )
        .unwrap();
        assert_eq!(member_ids(&single, &CAPTURE_ID_LIST), vec!["R1"]);

        let many = PaymentResponse::parse(
            "<GetCaptureDetailsResponse><GetCaptureDetailsResult><CaptureDetails>\
             <IdList><member>R1</member><member>R2</member></IdList>\
             </CaptureDetails></GetCaptureDetailsResult></GetCaptureDetailsResponse>",
        )
        .unwrap();
        assert_eq!(member_ids(&many, &CAPTURE_ID_LIST), vec!["R1", "R2"]);

        let none = PaymentResponse::parse(
            "<GetCaptureDetailsResponse><GetCaptureDetailsResult><CaptureDetails>\
             <IdList/></CaptureDetails></GetCaptureDetailsResult></GetCaptureDetailsResponse>",
        )
        .unwrap();
        assert!(member_ids(&none, &CAPTURE_ID_LIST).is_empty());
    }

    #[tokio::test]
    async fn test_charge_rejects_unknown_reference() {
        let client = AmazonPayClient::new(config()).unwrap();
        let err = client
            .charge("X01-000", "1.00", "auth-1", None, &ChargeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AmazonPayError::InvalidParameter(_)));
    }
}
