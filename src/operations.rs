//! Field tables for every API action.
//!
//! Each action is described as data: the snake_case field names a caller may set,
//! the wire key each one maps to, and whether it is required, defaulted, filled from
//! the client configuration or expanded as a numbered list. [`build_params`] turns a
//! caller's [`Fields`] into the flat [`Params`] the request pipeline signs.

use crate::errors::{AmazonPayError, Result};
use crate::types::{Action, Params};
use std::collections::BTreeMap;

/// How a field is filled when building parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Must be set by the caller
    Required,
    /// Sent only when set
    Optional,
    /// Sent with this value when the caller leaves it unset
    Default(&'static str),
    /// Client currency code unless the caller sets one
    Currency,
    /// Payment domain of the client region unless the caller sets one
    PaymentDomain,
    /// Expanded into `key.1`, `key.2`, ...
    List,
}

/// One caller-facing field of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// snake_case name used with [`Fields`]
    pub name: &'static str,
    /// Wire key (or list prefix)
    pub key: &'static str,
    /// Fill rule
    pub kind: FieldKind,
}

/// Field table of one action.
#[derive(Debug)]
pub struct OperationSpec {
    /// The action
    pub action: Action,
    /// Action specific fields; [`COMMON_FIELDS`] apply as well
    pub fields: &'static [FieldSpec],
}

impl OperationSpec {
    /// Looks a field up by name, including the common fields.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.all_fields().find(|field| field.name == name)
    }

    /// Action fields followed by the common fields.
    pub fn all_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().chain(COMMON_FIELDS.iter())
    }
}

const fn required(name: &'static str, key: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        key,
        kind: FieldKind::Required,
    }
}

const fn optional(name: &'static str, key: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        key,
        kind: FieldKind::Optional,
    }
}

const fn defaulted(name: &'static str, key: &'static str, value: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        key,
        kind: FieldKind::Default(value),
    }
}

const fn currency(key: &'static str) -> FieldSpec {
    FieldSpec {
        name: "currency_code",
        key,
        kind: FieldKind::Currency,
    }
}

const fn list(name: &'static str, key: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        key,
        kind: FieldKind::List,
    }
}

/// Fields every action accepts.
pub static COMMON_FIELDS: [FieldSpec; 2] = [
    optional("merchant_id", "SellerId"),
    optional("mws_auth_token", "MWSAuthToken"),
];

/// Field tables for all actions.
pub static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        action: Action::CreateOrderReferenceForId,
        fields: &[
            required("object_id", "Id"),
            required("object_id_type", "IdType"),
            required("order_total", "OrderTotal.Amount"),
            currency("OrderTotal.CurrencyCode"),
            defaulted("inherit_shipping_address", "InheritShippingAddress", "true"),
            defaulted("confirm_now", "ConfirmNow", "false"),
            optional("platform_id", "PlatformId"),
            optional("seller_note", "SellerNote"),
            optional("seller_order_id", "SellerOrderId"),
            optional("store_name", "StoreName"),
            optional("custom_information", "CustomInformation"),
        ],
    },
    OperationSpec {
        action: Action::GetBillingAgreementDetails,
        fields: &[
            required("amazon_billing_agreement_id", "AmazonBillingAgreementId"),
            optional("address_consent_token", "AddressConsentToken"),
        ],
    },
    OperationSpec {
        action: Action::SetBillingAgreementDetails,
        fields: &[
            required("amazon_billing_agreement_id", "AmazonBillingAgreementId"),
            optional("platform_id", "BillingAgreementAttributes.PlatformId"),
            optional("seller_note", "BillingAgreementAttributes.SellerNote"),
            optional(
                "seller_billing_agreement_id",
                "BillingAgreementAttributes.SellerBillingAgreementAttributes.SellerBillingAgreementId",
            ),
            optional(
                "store_name",
                "BillingAgreementAttributes.SellerBillingAgreementAttributes.StoreName",
            ),
            optional(
                "custom_information",
                "BillingAgreementAttributes.SellerBillingAgreementAttributes.CustomInformation",
            ),
        ],
    },
    OperationSpec {
        action: Action::ConfirmBillingAgreement,
        fields: &[required("amazon_billing_agreement_id", "AmazonBillingAgreementId")],
    },
    OperationSpec {
        action: Action::ValidateBillingAgreement,
        fields: &[required("amazon_billing_agreement_id", "AmazonBillingAgreementId")],
    },
    OperationSpec {
        action: Action::AuthorizeOnBillingAgreement,
        fields: &[
            required("amazon_billing_agreement_id", "AmazonBillingAgreementId"),
            required("authorization_reference_id", "AuthorizationReferenceId"),
            required("authorization_amount", "AuthorizationAmount.Amount"),
            currency("AuthorizationAmount.CurrencyCode"),
            defaulted("transaction_timeout", "TransactionTimeout", "1440"),
            defaulted("capture_now", "CaptureNow", "false"),
            optional("seller_authorization_note", "SellerAuthorizationNote"),
            optional("soft_descriptor", "SoftDescriptor"),
            optional("seller_note", "SellerNote"),
            optional("platform_id", "PlatformId"),
            defaulted("inherit_shipping_address", "InheritShippingAddress", "true"),
            optional("seller_order_id", "SellerOrderAttributes.SellerOrderId"),
            optional("store_name", "SellerOrderAttributes.StoreName"),
            optional("custom_information", "SellerOrderAttributes.CustomInformation"),
        ],
    },
    OperationSpec {
        action: Action::CloseBillingAgreement,
        fields: &[
            required("amazon_billing_agreement_id", "AmazonBillingAgreementId"),
            optional("closure_reason", "ClosureReason"),
        ],
    },
    OperationSpec {
        action: Action::SetOrderReferenceDetails,
        fields: &[
            required("amazon_order_reference_id", "AmazonOrderReferenceId"),
            required("order_total", "OrderReferenceAttributes.OrderTotal.Amount"),
            currency("OrderReferenceAttributes.OrderTotal.CurrencyCode"),
            optional("platform_id", "OrderReferenceAttributes.PlatformId"),
            optional("seller_note", "OrderReferenceAttributes.SellerNote"),
            optional(
                "seller_order_id",
                "OrderReferenceAttributes.SellerOrderAttributes.SellerOrderId",
            ),
            optional(
                "store_name",
                "OrderReferenceAttributes.SellerOrderAttributes.StoreName",
            ),
            optional(
                "custom_information",
                "OrderReferenceAttributes.SellerOrderAttributes.CustomInformation",
            ),
        ],
    },
    OperationSpec {
        action: Action::SetOrderAttributes,
        fields: &[
            required("amazon_order_reference_id", "AmazonOrderReferenceId"),
            optional("currency_code", "OrderAttributes.OrderTotal.CurrencyCode"),
            optional("amount", "OrderAttributes.OrderTotal.Amount"),
            optional(
                "seller_order_id",
                "OrderAttributes.SellerOrderAttributes.SellerOrderId",
            ),
            optional(
                "payment_service_provider_id",
                "OrderAttributes.PaymentServiceProviderAttributes.PaymentServiceProviderId",
            ),
            optional(
                "payment_service_provider_order_id",
                "OrderAttributes.PaymentServiceProviderAttributes.PaymentServiceProviderOrderId",
            ),
            optional("platform_id", "OrderAttributes.PlatformId"),
            optional("seller_note", "OrderAttributes.SellerNote"),
            optional(
                "request_payment_authorization",
                "OrderAttributes.RequestPaymentAuthorization",
            ),
            optional("store_name", "OrderAttributes.SellerOrderAttributes.StoreName"),
            list(
                "list_order_item_categories",
                "OrderAttributes.SellerOrderAttributes.OrderItemCategories.OrderItemCategory",
            ),
            optional(
                "custom_information",
                "OrderAttributes.SellerOrderAttributes.CustomInformation",
            ),
        ],
    },
    OperationSpec {
        action: Action::GetOrderReferenceDetails,
        fields: &[
            required("amazon_order_reference_id", "AmazonOrderReferenceId"),
            optional("address_consent_token", "AddressConsentToken"),
            optional("access_token", "AccessToken"),
        ],
    },
    OperationSpec {
        action: Action::ConfirmOrderReference,
        fields: &[required("amazon_order_reference_id", "AmazonOrderReferenceId")],
    },
    OperationSpec {
        action: Action::CancelOrderReference,
        fields: &[
            required("amazon_order_reference_id", "AmazonOrderReferenceId"),
            optional("cancelation_reason", "CancelationReason"),
        ],
    },
    OperationSpec {
        action: Action::CloseOrderReference,
        fields: &[
            required("amazon_order_reference_id", "AmazonOrderReferenceId"),
            optional("closure_reason", "ClosureReason"),
        ],
    },
    OperationSpec {
        action: Action::ListOrderReference,
        fields: &[
            required("query_id", "QueryId"),
            required("query_id_type", "QueryIdType"),
            FieldSpec {
                name: "payment_domain",
                key: "PaymentDomain",
                kind: FieldKind::PaymentDomain,
            },
            optional("created_time_range_start", "CreatedTimeRange.StartTime"),
            optional("created_time_range_end", "CreatedTimeRange.EndTime"),
            optional("sort_order", "SortOrder"),
            optional("page_size", "PageSize"),
            list(
                "order_reference_status_list_filter",
                "OrderReferenceStatusListFilter.OrderReferenceStatus",
            ),
        ],
    },
    OperationSpec {
        action: Action::ListOrderReferenceByNextToken,
        fields: &[required("next_page_token", "NextPageToken")],
    },
    OperationSpec {
        action: Action::Authorize,
        fields: &[
            required("amazon_order_reference_id", "AmazonOrderReferenceId"),
            required("authorization_reference_id", "AuthorizationReferenceId"),
            required("authorization_amount", "AuthorizationAmount.Amount"),
            currency("AuthorizationAmount.CurrencyCode"),
            optional("seller_authorization_note", "SellerAuthorizationNote"),
            defaulted("transaction_timeout", "TransactionTimeout", "1440"),
            defaulted("capture_now", "CaptureNow", "false"),
            optional("soft_descriptor", "SoftDescriptor"),
        ],
    },
    OperationSpec {
        action: Action::GetAuthorizationDetails,
        fields: &[required("amazon_authorization_id", "AmazonAuthorizationId")],
    },
    OperationSpec {
        action: Action::Capture,
        fields: &[
            required("amazon_authorization_id", "AmazonAuthorizationId"),
            required("capture_reference_id", "CaptureReferenceId"),
            required("capture_amount", "CaptureAmount.Amount"),
            currency("CaptureAmount.CurrencyCode"),
            optional("seller_capture_note", "SellerCaptureNote"),
            optional("soft_descriptor", "SoftDescriptor"),
        ],
    },
    OperationSpec {
        action: Action::GetCaptureDetails,
        fields: &[required("amazon_capture_id", "AmazonCaptureId")],
    },
    OperationSpec {
        action: Action::CloseAuthorization,
        fields: &[
            required("amazon_authorization_id", "AmazonAuthorizationId"),
            optional("closure_reason", "ClosureReason"),
        ],
    },
    OperationSpec {
        action: Action::Refund,
        fields: &[
            required("amazon_capture_id", "AmazonCaptureId"),
            required("refund_reference_id", "RefundReferenceId"),
            required("refund_amount", "RefundAmount.Amount"),
            currency("RefundAmount.CurrencyCode"),
            optional("seller_refund_note", "SellerRefundNote"),
            optional("soft_descriptor", "SoftDescriptor"),
        ],
    },
    OperationSpec {
        action: Action::GetRefundDetails,
        fields: &[required("amazon_refund_id", "AmazonRefundId")],
    },
    OperationSpec {
        action: Action::GetServiceStatus,
        fields: &[],
    },
];

/// Field table of `action`.
pub fn spec_for(action: Action) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|spec| spec.action == action)
}

/// Value of one caller field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Single value; for list fields a comma separated list
    Text(String),
    /// Explicit list
    List(Vec<String>),
}

/// Caller-supplied fields for one action, by snake_case name.
///
/// # Examples
///
/// ```
/// use amazon_pay::operations::{build_params, spec_for, FieldContext, Fields};
/// use amazon_pay::types::Action;
///
/// let fields = Fields::new()
///     .set("amazon_order_reference_id", "S01-0000000-0000000")
///     .set("authorization_reference_id", "auth-1")
///     .set("authorization_amount", "10.00")
///     .set("capture_now", true);
///
/// let context = FieldContext { currency_code: "USD", payment_domain: "NA_USD" };
/// let params = build_params(spec_for(Action::Authorize).unwrap(), &fields, &context).unwrap();
///
/// assert_eq!(params.get("AuthorizationAmount.CurrencyCode"), Some("USD"));
/// assert_eq!(params.get("CaptureNow"), Some("true"));
/// assert_eq!(params.get("TransactionTimeout"), Some("1440"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    /// Creates an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    pub fn set(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), FieldValue::Text(value.to_string()));
        self
    }

    /// Sets a field when `value` is `Some`.
    pub fn set_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.set(name, value),
            None => self,
        }
    }

    /// Sets a list field.
    pub fn list<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.0.insert(name.into(), FieldValue::List(values));
        self
    }

    /// Value of a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Names of the fields that are set.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Client-derived values for [`FieldKind::Currency`] and [`FieldKind::PaymentDomain`].
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// Client currency code
    pub currency_code: &'a str,
    /// Payment domain of the client region
    pub payment_domain: &'a str,
}

/// Builds the parameter map for one call.
///
/// Fails with [`AmazonPayError::InvalidParameter`] on a field the action does not
/// know, a missing required field, a list given for a single-valued field or an
/// empty list.
pub fn build_params(
    spec: &OperationSpec,
    fields: &Fields,
    context: &FieldContext<'_>,
) -> Result<Params> {
    if let Some(unknown) = fields.names().find(|name| spec.field(name).is_none()) {
        return Err(AmazonPayError::InvalidParameter(format!(
            "`{}` is not a field of {}",
            unknown, spec.action
        )));
    }

    let mut params = Params::with_action(spec.action);
    for field in spec.all_fields() {
        match (fields.get(field.name), field.kind) {
            (Some(FieldValue::Text(value)), FieldKind::List) => {
                params.enumerate(field.key, &split_list(field.name, value)?);
            }
            (Some(FieldValue::List(values)), FieldKind::List) => {
                if values.is_empty() {
                    return Err(empty_list(field.name));
                }
                params.enumerate(field.key, values);
            }
            (Some(FieldValue::List(_)), _) => {
                return Err(AmazonPayError::InvalidParameter(format!(
                    "`{}` takes a single value",
                    field.name
                )));
            }
            (Some(FieldValue::Text(value)), _) => {
                params.insert(field.key, value);
            }
            (None, FieldKind::Required) => {
                return Err(AmazonPayError::InvalidParameter(format!(
                    "{} requires `{}`",
                    spec.action, field.name
                )));
            }
            (None, FieldKind::Default(value)) => {
                params.insert(field.key, value);
            }
            (None, FieldKind::Currency) => {
                params.insert(field.key, context.currency_code);
            }
            (None, FieldKind::PaymentDomain) => {
                params.insert(field.key, context.payment_domain);
            }
            (None, FieldKind::Optional | FieldKind::List) => {}
        }
    }

    Ok(params)
}

/// "Open, Closed" -> ["Open", "Closed"]; a value without commas is a one-element list.
fn split_list(name: &str, value: &str) -> Result<Vec<String>> {
    let values: Vec<String> = value
        .split(',')
        .map(|item| item.split_whitespace().collect::<String>())
        .filter(|item| !item.is_empty())
        .collect();

    if values.is_empty() {
        return Err(empty_list(name));
    }
    Ok(values)
}

fn empty_list(name: &str) -> AmazonPayError {
    AmazonPayError::InvalidParameter(format!("`{}` must not be empty", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: FieldContext<'static> = FieldContext {
        currency_code: "EUR",
        payment_domain: "EU_EUR",
    };

    fn build(action: Action, fields: Fields) -> Result<Params> {
        build_params(spec_for(action).unwrap(), &fields, &CONTEXT)
    }

    #[test]
    fn test_every_action_has_a_table() {
        for action in Action::ALL {
            assert!(spec_for(action).is_some(), "no table for {}", action);
        }
        assert_eq!(OPERATIONS.len(), Action::ALL.len());
    }

    #[test]
    fn test_field_names_unique_per_action() {
        for spec in OPERATIONS {
            let mut names: Vec<_> = spec.all_fields().map(|f| f.name).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate field in {}", spec.action);
        }
    }

    #[test]
    fn test_defaults_and_currency_injected() {
        let params = build(
            Action::CreateOrderReferenceForId,
            Fields::new()
                .set("object_id", "B01-0000000-0000000")
                .set("object_id_type", "BillingAgreement")
                .set("order_total", "25.00"),
        )
        .unwrap();

        assert_eq!(params.get("Action"), Some("CreateOrderReferenceForId"));
        assert_eq!(params.get("OrderTotal.CurrencyCode"), Some("EUR"));
        assert_eq!(params.get("InheritShippingAddress"), Some("true"));
        assert_eq!(params.get("ConfirmNow"), Some("false"));
        assert!(!params.contains_key("SellerNote"));
    }

    #[test]
    fn test_caller_overrides_default() {
        let params = build(
            Action::Capture,
            Fields::new()
                .set("amazon_authorization_id", "P01-1")
                .set("capture_reference_id", "cap-1")
                .set("capture_amount", "5.00")
                .set("currency_code", "GBP"),
        )
        .unwrap();

        assert_eq!(params.get("CaptureAmount.CurrencyCode"), Some("GBP"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = build(
            Action::ConfirmOrderReference,
            Fields::new()
                .set("amazon_order_reference_id", "S01-1")
                .set("order_total", "1.00"),
        )
        .unwrap_err();

        assert!(matches!(err, AmazonPayError::InvalidParameter(msg) if msg.contains("order_total")));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err = build(Action::Refund, Fields::new().set("amazon_capture_id", "P01-1")).unwrap_err();
        assert!(matches!(err, AmazonPayError::InvalidParameter(msg) if msg.contains("refund_reference_id")));
    }

    #[test]
    fn test_common_fields_accepted_everywhere() {
        let params = build(
            Action::GetServiceStatus,
            Fields::new()
                .set("merchant_id", "OTHER_SELLER")
                .set("mws_auth_token", "amzn.mws.token"),
        )
        .unwrap();

        assert_eq!(params.get("SellerId"), Some("OTHER_SELLER"));
        assert_eq!(params.get("MWSAuthToken"), Some("amzn.mws.token"));
    }

    #[test]
    fn test_list_field_from_vec() {
        let params = build(
            Action::SetOrderAttributes,
            Fields::new()
                .set("amazon_order_reference_id", "S01-1")
                .list("list_order_item_categories", ["Antiques", "Outdoor"]),
        )
        .unwrap();

        let prefix = "OrderAttributes.SellerOrderAttributes.OrderItemCategories.OrderItemCategory";
        assert_eq!(params.get(&format!("{}.1", prefix)), Some("Antiques"));
        assert_eq!(params.get(&format!("{}.2", prefix)), Some("Outdoor"));
    }

    #[test]
    fn test_list_field_from_comma_string_and_payment_domain() {
        let params = build(
            Action::ListOrderReference,
            Fields::new()
                .set("query_id", "order-1")
                .set("query_id_type", "SellerOrderId")
                .set("order_reference_status_list_filter", "Open, Closed"),
        )
        .unwrap();

        assert_eq!(params.get("PaymentDomain"), Some("EU_EUR"));
        assert_eq!(
            params.get("OrderReferenceStatusListFilter.OrderReferenceStatus.1"),
            Some("Open")
        );
        assert_eq!(
            params.get("OrderReferenceStatusListFilter.OrderReferenceStatus.2"),
            Some("Closed")
        );
    }

    #[test]
    fn test_list_value_for_scalar_field_rejected() {
        let err = build(
            Action::GetRefundDetails,
            Fields::new().list("amazon_refund_id", ["a", "b"]),
        )
        .unwrap_err();
        assert!(matches!(err, AmazonPayError::InvalidParameter(_)));
    }

    #[test]
    fn test_empty_list_rejected() {
        let err = build(
            Action::ListOrderReference,
            Fields::new()
                .set("query_id", "q")
                .set("query_id_type", "SellerOrderId")
                .set("order_reference_status_list_filter", " , "),
        )
        .unwrap_err();
        assert!(matches!(err, AmazonPayError::InvalidParameter(_)));
    }
}
