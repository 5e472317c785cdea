//! Billing API request and response types.
//!
//! These mirror the account billing endpoints used by the checkout flow:
//! client token issuance, one-time payments and stored payment methods.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapter::ClientToken;
use crate::tokenize::Nonce;

/// Response of `POST /account/client-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTokenResponse {
    /// Token for one checkout attempt.
    pub client_token: ClientToken,
}

/// Non-fatal notice attached to a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Short summary.
    pub title: String,
    /// Longer explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of `POST /account/payments`.
///
/// Owns the nonce: a request can be sent once.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct MakePaymentRequest {
    /// Amount in US dollars, as a decimal string.
    pub usd: String,
    /// Single-use payment nonce.
    pub nonce: Nonce,
}

/// A payment recorded against the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier.
    pub id: u64,
    /// When the payment was made.
    pub date: String,
    /// Amount in US dollars.
    pub usd: Decimal,
    /// Warnings returned with the payment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Payment method type accepted by `POST /account/payment-methods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    /// A gateway nonce.
    PaymentMethodNonce,
}

/// Nonce payload of an add-payment-method request.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct PaymentMethodNonceData {
    /// Single-use payment nonce.
    pub nonce: Nonce,
}

/// Body of `POST /account/payment-methods`.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct AddPaymentMethodRequest {
    /// Always [`PaymentMethodKind::PaymentMethodNonce`] for Google Pay.
    #[serde(rename = "type")]
    pub kind: PaymentMethodKind,
    /// Nonce payload.
    pub data: PaymentMethodNonceData,
    /// Whether the new method becomes the account default.
    pub is_default: bool,
}

impl AddPaymentMethodRequest {
    /// A request storing `nonce` as the default payment method.
    #[must_use]
    pub const fn default_method(nonce: Nonce) -> Self {
        Self {
            kind: PaymentMethodKind::PaymentMethodNonce,
            data: PaymentMethodNonceData { nonce },
            is_default: true,
        }
    }
}

/// A stored payment method as listed by `GET /account/payment-methods`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Payment method identifier.
    pub id: u64,
    /// Method type, e.g. `"credit_card"` or `"google_pay"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether this is the default method.
    pub is_default: bool,
    /// Creation timestamp.
    #[serde(default)]
    pub created: Option<String>,
    /// Type-specific details such as card type and last four digits.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Page number, starting at 1.
    pub page: u32,
    /// Total number of pages.
    pub pages: u32,
    /// Total number of items.
    pub results: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_payment_method_body_matches_api() {
        let body = AddPaymentMethodRequest::default_method(Nonce::new("tokencc_abc"));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "type": "payment_method_nonce",
                "data": {"nonce": "tokencc_abc"},
                "is_default": true
            })
        );
    }

    #[test]
    fn make_payment_body_matches_api() {
        let body = MakePaymentRequest {
            usd: "10.00".into(),
            nonce: Nonce::new("fake-android-pay-nonce"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"usd": "10.00", "nonce": "fake-android-pay-nonce"})
        );
    }

    #[test]
    fn payment_accepts_numeric_amount_and_warnings() {
        let payment: Payment = serde_json::from_value(json!({
            "id": 7,
            "date": "2026-10-16T12:00:00",
            "usd": 10.5,
            "warnings": [{"title": "Payment pending", "detail": "Review in progress"}]
        }))
        .unwrap();
        assert_eq!(payment.usd, Decimal::new(105, 1));
        assert_eq!(payment.warnings[0].title, "Payment pending");
    }
}
