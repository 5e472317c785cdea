//! Wire format types for the Google Pay API.
//!
//! Field names and enum spellings follow the Google Pay JSON protocol exactly,
//! so every type here round-trips through the provider SDK untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Google Pay API major version sent with every request.
pub const API_VERSION: u8 = 2;

/// Google Pay API minor version sent with every request.
pub const API_VERSION_MINOR: u8 = 0;

/// Status of the total price in a [`TransactionInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TotalPriceStatus {
    /// The price will not change. Requires a total price.
    Final,
    /// The price may still change, e.g. with shipping.
    Estimated,
    /// No amount is charged, e.g. when adding a payment method.
    NotCurrentlyKnown,
}

/// Details of the charge shown on the payment sheet.
///
/// `total_price` is kept as the caller's decimal string so that it is echoed
/// back verbatim in user-facing messages.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    /// Whether the total is final, estimated, or absent.
    pub total_price_status: TotalPriceStatus,
    /// Decimal amount, e.g. `"10.00"`.
    #[serde(default)]
    pub total_price: Option<String>,
    /// ISO 4217 currency code.
    pub currency_code: String,
    /// ISO 3166-1 alpha-2 country code of the merchant.
    #[serde(default)]
    pub country_code: Option<String>,
    /// Custom label for the total.
    #[serde(default)]
    pub total_price_label: Option<String>,
}

impl TransactionInfo {
    /// A final charge of `total_price` in `currency_code`.
    #[must_use]
    pub fn final_price(total_price: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            total_price_status: TotalPriceStatus::Final,
            total_price: Some(total_price.into()),
            currency_code: currency_code.into(),
            country_code: None,
            total_price_label: None,
        }
    }

    /// A transaction with no amount, used when storing a payment method.
    #[must_use]
    pub fn not_currently_known(currency_code: impl Into<String>) -> Self {
        Self {
            total_price_status: TotalPriceStatus::NotCurrentlyKnown,
            total_price: None,
            currency_code: currency_code.into(),
            country_code: None,
            total_price_label: None,
        }
    }

    /// Sets the merchant country code.
    #[must_use]
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    /// Sets the label shown next to the total.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.total_price_label = Some(label.into());
        self
    }
}

/// Merchant identity displayed on the payment sheet.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantInfo {
    /// Google merchant identifier. Absent in test environments.
    #[serde(default)]
    pub merchant_id: Option<String>,
    /// Name shown to the user.
    pub merchant_name: String,
}

/// Card authentication methods accepted by the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    /// Card stored on file with the user's Google account.
    #[serde(rename = "PAN_ONLY")]
    PanOnly,
    /// Device token with a 3-D Secure cryptogram.
    #[serde(rename = "CRYPTOGRAM_3DS")]
    Cryptogram3ds,
}

/// Card networks accepted by the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardNetwork {
    /// American Express.
    Amex,
    /// Discover.
    Discover,
    /// Interac.
    Interac,
    /// JCB.
    Jcb,
    /// Mastercard.
    Mastercard,
    /// Visa.
    Visa,
}

impl CardNetwork {
    /// Networks accepted when none are configured.
    pub const DEFAULT: [Self; 5] = [
        Self::Amex,
        Self::Discover,
        Self::Jcb,
        Self::Mastercard,
        Self::Visa,
    ];
}

/// Payment method type. Only cards are supported by Google Pay on the web.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    /// Credit or debit card.
    Card,
}

/// Parameters of a `CARD` payment method.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardParameters {
    /// Accepted authentication methods.
    pub allowed_auth_methods: Vec<AuthMethod>,
    /// Accepted card networks.
    pub allowed_card_networks: Vec<CardNetwork>,
    /// Whether a billing address must be collected.
    #[serde(default)]
    pub billing_address_required: Option<bool>,
}

/// How the selected card is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenizationType {
    /// Tokenized by a supported payment gateway.
    PaymentGateway,
    /// Encrypted directly for the merchant.
    Direct,
}

/// Gateway tokenization parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationSpecification {
    /// Tokenization type.
    #[serde(rename = "type")]
    pub kind: TokenizationType,
    /// Gateway-specific parameters such as `gateway` and `braintree:merchantId`.
    pub parameters: BTreeMap<String, String>,
}

/// A payment method the merchant accepts.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedPaymentMethod {
    /// Payment method type.
    #[serde(rename = "type")]
    pub kind: PaymentMethodType,
    /// Card parameters.
    pub parameters: CardParameters,
    /// Tokenization settings. Omitted in readiness requests.
    #[serde(default)]
    pub tokenization_specification: Option<TokenizationSpecification>,
}

/// Callbacks the merchant handles while the sheet is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackIntent {
    /// The merchant authorizes the payment before the sheet closes.
    PaymentAuthorization,
}

/// Request passed to `loadPaymentData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDataRequest {
    /// Major API version.
    pub api_version: u8,
    /// Minor API version.
    pub api_version_minor: u8,
    /// Merchant identity.
    pub merchant_info: MerchantInfo,
    /// Accepted payment methods.
    pub allowed_payment_methods: Vec<AllowedPaymentMethod>,
    /// Charge details.
    pub transaction_info: TransactionInfo,
    /// Callback intents registered for this request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callback_intents: Vec<CallbackIntent>,
}

/// Request passed to `isReadyToPay`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsReadyToPayRequest {
    /// Major API version.
    pub api_version: u8,
    /// Minor API version.
    pub api_version_minor: u8,
    /// Payment methods to check.
    pub allowed_payment_methods: Vec<AllowedPaymentMethod>,
    /// Only report ready if the user already has a matching payment method.
    #[serde(default)]
    pub existing_payment_method_required: Option<bool>,
}

impl IsReadyToPayRequest {
    /// Derives the readiness query for a payment data request.
    #[must_use]
    pub fn for_payment(request: &PaymentDataRequest) -> Self {
        Self {
            api_version: request.api_version,
            api_version_minor: request.api_version_minor,
            allowed_payment_methods: request.allowed_payment_methods.clone(),
            existing_payment_method_required: Some(true),
        }
    }
}

/// Response of `isReadyToPay`.
#[skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsReadyToPayResponse {
    /// Whether the device and browser can pay.
    pub result: bool,
    /// Whether the user has a matching payment method on file.
    #[serde(default)]
    pub payment_method_present: Option<bool>,
}

/// Card summary returned with the payment data.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    /// Card network, e.g. `"VISA"`.
    #[serde(default)]
    pub card_network: Option<String>,
    /// Last four digits.
    #[serde(default)]
    pub card_details: Option<String>,
}

/// Tokenized credentials produced by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationData {
    /// Tokenization type, e.g. `"PAYMENT_GATEWAY"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Gateway token, a JSON document for Braintree.
    pub token: String,
}

/// The payment method the user selected.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodData {
    /// Payment method type, e.g. `"CARD"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// User-facing description of the card.
    #[serde(default)]
    pub description: Option<String>,
    /// Card summary.
    #[serde(default)]
    pub info: Option<CardInfo>,
    /// Tokenized credentials.
    pub tokenization_data: TokenizationData,
}

/// Result of a confirmed payment sheet.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    /// Major API version.
    pub api_version: u8,
    /// Minor API version.
    pub api_version_minor: u8,
    /// Selected payment method.
    pub payment_method_data: PaymentMethodData,
    /// User email, when requested.
    #[serde(default)]
    pub email: Option<String>,
}

/// Outcome the merchant returns from the authorization callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    /// Payment accepted; the sheet closes.
    Success,
    /// Payment refused; the sheet shows the error.
    Error,
}

/// Error shown on the sheet when authorization is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDataError {
    /// Machine-readable reason, e.g. `"PAYMENT_DATA_INVALID"`.
    pub reason: String,
    /// User-facing message.
    pub message: String,
    /// Intent the error belongs to.
    pub intent: CallbackIntent,
}

/// Result of `onPaymentAuthorized`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorizationResult {
    /// Accept or refuse.
    pub transaction_state: TransactionState,
    /// Error to show when refused.
    #[serde(default)]
    pub error: Option<PaymentDataError>,
}

impl PaymentAuthorizationResult {
    /// An accepting result.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            transaction_state: TransactionState::Success,
            error: None,
        }
    }

    /// A refusing result with the given reason and message.
    #[must_use]
    pub fn error(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            transaction_state: TransactionState::Error,
            error: Some(PaymentDataError {
                reason: reason.into(),
                message: message.into(),
                intent: CallbackIntent::PaymentAuthorization,
            }),
        }
    }

    /// Whether the payment was accepted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.transaction_state == TransactionState::Success
    }
}
