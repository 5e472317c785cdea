//! Payment gateway SDK adapter.
//!
//! The adapter establishes the two provider sessions a checkout attempt needs:
//! a gateway client created from a single-use [`ClientToken`], and a Google Pay
//! [`InstrumentSession`] derived from it. The session is returned to the
//! caller and moved into the [`Checkout`](crate::Checkout) for that attempt;
//! nothing is kept in shared state, so concurrent attempts never overwrite
//! each other's session.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{GooglePayConfig, InstrumentOptions};
use crate::error::{BuildError, InitError, ProviderError};
use crate::feedback::{ExceptionReporter, TracingReporter};
use crate::proto::{
    API_VERSION, API_VERSION_MINOR, AllowedPaymentMethod, AuthMethod, CallbackIntent,
    CardNetwork, CardParameters, MerchantInfo, PaymentDataRequest, PaymentMethodType,
    TokenizationSpecification, TokenizationType, TotalPriceStatus, TransactionInfo,
};
use crate::provider::PaymentGateway;

/// Gateway name used in tokenization parameters.
pub const GATEWAY_NAME: &str = "braintree";

/// Gateway client API version used in tokenization parameters.
pub const GATEWAY_API_VERSION: &str = "v1";

/// Context attached to exception reports for initialization failures.
pub const INIT_ERROR_CONTEXT: &str = "Error initializing Google Pay.";

static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z]{3}$").expect("valid currency regex"));

static COUNTRY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z]{2}$").expect("valid country regex"));

/// Opaque client token issued by the billing API for one checkout attempt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientToken(String);

impl fmt::Debug for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClientToken").field(&"<redacted>").finish()
    }
}

impl From<String> for ClientToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ClientToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl ClientToken {
    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Decodes the token as a base64 JSON client token, if it is one.
    #[must_use]
    pub fn claims(&self) -> Option<ClientTokenClaims> {
        let bytes = STANDARD.decode(self.0.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Decoded contents of a gateway client token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenClaims {
    /// Client token format version.
    #[serde(default)]
    pub version: u8,
    /// Fingerprint authorizing client API calls.
    pub authorization_fingerprint: String,
    /// Gateway environment, e.g. `"sandbox"` or `"production"`.
    pub environment: String,
    /// Gateway merchant identifier.
    pub merchant_id: String,
    /// Gateway configuration endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_url: Option<String>,
}

impl ClientTokenClaims {
    /// Encodes these claims into a base64 client token.
    ///
    /// # Panics
    ///
    /// Never in practice: the claims contain only strings and integers.
    #[must_use]
    pub fn encode(&self) -> ClientToken {
        let json = serde_json::to_vec(self).expect("claims serialize to JSON");
        ClientToken(STANDARD.encode(json))
    }
}

/// How the gateway client is authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum GatewayAuthorization {
    /// A decoded client token.
    ClientToken(ClientTokenClaims),
    /// A static tokenization key, `<environment>_<id>_<merchant>`.
    TokenizationKey(String),
}

impl fmt::Debug for GatewayAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientToken(_) => f.write_str("ClientToken(<redacted>)"),
            Self::TokenizationKey(_) => f.write_str("TokenizationKey(<redacted>)"),
        }
    }
}

/// Handle to a gateway client created from a client token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayClient {
    authorization: GatewayAuthorization,
    merchant_id: String,
    environment: String,
}

impl GatewayClient {
    /// Parses the authorization carried by a client token.
    ///
    /// Accepts either a base64 JSON client token or a tokenization key.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Rejected`] with `"CLIENT_INVALID_AUTHORIZATION"`
    /// if the token is neither.
    pub fn from_token(token: &ClientToken) -> Result<Self, ProviderError> {
        if let Some(claims) = token.claims() {
            return Ok(Self {
                merchant_id: claims.merchant_id.clone(),
                environment: claims.environment.clone(),
                authorization: GatewayAuthorization::ClientToken(claims),
            });
        }

        let raw = token.as_str().trim();
        let mut parts = raw.splitn(3, '_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(env @ ("sandbox" | "production" | "development")), Some(id), Some(merchant))
                if !id.is_empty() && !merchant.is_empty() =>
            {
                Ok(Self {
                    merchant_id: merchant.to_owned(),
                    environment: env.to_owned(),
                    authorization: GatewayAuthorization::TokenizationKey(raw.to_owned()),
                })
            }
            _ => Err(ProviderError::rejected(
                "CLIENT_INVALID_AUTHORIZATION",
                "Authorization is invalid. Make sure your client token or tokenization key is valid.",
            )),
        }
    }

    /// Gateway merchant identifier.
    #[must_use]
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// Gateway environment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Authorization used by this client.
    #[must_use]
    pub const fn authorization(&self) -> &GatewayAuthorization {
        &self.authorization
    }
}

/// Google Pay session bound to one gateway client and merchant.
///
/// Builds well-formed [`PaymentDataRequest`]s for the lifetime of one checkout
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentSession {
    client: GatewayClient,
    google_pay_version: u8,
    merchant_info: MerchantInfo,
    allowed_card_networks: Vec<CardNetwork>,
    billing_address_required: bool,
}

impl InstrumentSession {
    /// Creates a session for a gateway client.
    ///
    /// Gateway implementations call this once they have accepted the options.
    #[must_use]
    pub fn new(client: GatewayClient, options: &InstrumentOptions) -> Self {
        Self {
            client,
            google_pay_version: options.google_pay_version,
            merchant_info: MerchantInfo {
                merchant_id: options.google_merchant_id.clone(),
                merchant_name: GooglePayConfig::default().merchant_name,
            },
            allowed_card_networks: CardNetwork::DEFAULT.to_vec(),
            billing_address_required: false,
        }
    }

    /// Applies the merchant name and card settings from the checkout config.
    #[must_use]
    pub fn with_config(mut self, config: &GooglePayConfig) -> Self {
        self.merchant_info.merchant_name.clone_from(&config.merchant_name);
        self.allowed_card_networks.clone_from(&config.allowed_card_networks);
        self.billing_address_required = config.billing_address_required;
        self
    }

    /// The gateway client this session is bound to.
    #[must_use]
    pub const fn client(&self) -> &GatewayClient {
        &self.client
    }

    /// Google Pay API version negotiated with the gateway.
    #[must_use]
    pub const fn google_pay_version(&self) -> u8 {
        self.google_pay_version
    }

    /// Merchant information placed in every request.
    #[must_use]
    pub const fn merchant_info(&self) -> &MerchantInfo {
        &self.merchant_info
    }

    /// Builds a payment data request for the given transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the transaction fails validation.
    pub fn create_payment_data_request(
        &self,
        transaction_info: &TransactionInfo,
    ) -> Result<PaymentDataRequest, BuildError> {
        validate_transaction(transaction_info)?;

        Ok(PaymentDataRequest {
            api_version: API_VERSION,
            api_version_minor: API_VERSION_MINOR,
            merchant_info: self.merchant_info.clone(),
            allowed_payment_methods: vec![AllowedPaymentMethod {
                kind: PaymentMethodType::Card,
                parameters: CardParameters {
                    allowed_auth_methods: vec![AuthMethod::PanOnly, AuthMethod::Cryptogram3ds],
                    allowed_card_networks: self.allowed_card_networks.clone(),
                    billing_address_required: self.billing_address_required.then_some(true),
                },
                tokenization_specification: Some(self.tokenization_specification()),
            }],
            transaction_info: transaction_info.clone(),
            callback_intents: vec![CallbackIntent::PaymentAuthorization],
        })
    }

    fn tokenization_specification(&self) -> TokenizationSpecification {
        let mut parameters = BTreeMap::new();
        parameters.insert("gateway".to_owned(), GATEWAY_NAME.to_owned());
        parameters.insert(
            "braintree:merchantId".to_owned(),
            self.client.merchant_id.clone(),
        );
        parameters.insert(
            "braintree:apiVersion".to_owned(),
            GATEWAY_API_VERSION.to_owned(),
        );
        parameters.insert(
            "braintree:sdkVersion".to_owned(),
            env!("CARGO_PKG_VERSION").to_owned(),
        );
        parameters.insert(
            "braintree:metadata".to_owned(),
            serde_json::json!({"source": "client", "integration": "custom", "platform": "web"})
                .to_string(),
        );
        match &self.client.authorization {
            GatewayAuthorization::ClientToken(claims) => {
                parameters.insert(
                    "braintree:authorizationFingerprint".to_owned(),
                    claims.authorization_fingerprint.clone(),
                );
            }
            GatewayAuthorization::TokenizationKey(key) => {
                parameters.insert("braintree:clientKey".to_owned(), key.clone());
            }
        }
        TokenizationSpecification {
            kind: TokenizationType::PaymentGateway,
            parameters,
        }
    }
}

/// Checks a transaction against the Google Pay field rules.
fn validate_transaction(info: &TransactionInfo) -> Result<(), BuildError> {
    if !CURRENCY_CODE.is_match(&info.currency_code) {
        return Err(BuildError::InvalidCurrencyCode(info.currency_code.clone()));
    }
    if let Some(country) = &info.country_code
        && !COUNTRY_CODE.is_match(country)
    {
        return Err(BuildError::InvalidCountryCode(country.clone()));
    }
    match &info.total_price {
        Some(price) => {
            let amount: Decimal = price
                .trim()
                .parse()
                .map_err(|_| BuildError::InvalidTotalPrice(price.clone()))?;
            if amount.is_sign_negative() {
                return Err(BuildError::InvalidTotalPrice(price.clone()));
            }
        }
        None if info.total_price_status == TotalPriceStatus::Final => {
            return Err(BuildError::MissingTotalPrice);
        }
        None => {}
    }
    Ok(())
}

/// Creates instrument sessions from client tokens.
#[derive(Clone)]
pub struct PaymentAdapter {
    gateway: Arc<dyn PaymentGateway>,
    config: GooglePayConfig,
    reporter: Arc<dyn ExceptionReporter>,
}

impl fmt::Debug for PaymentAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaymentAdapter {
    /// Creates an adapter that reports failures through [`TracingReporter`].
    pub fn new(gateway: impl PaymentGateway + 'static, config: GooglePayConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            config,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replaces the exception reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl ExceptionReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Establishes the gateway client and the Google Pay session for one
    /// checkout attempt.
    ///
    /// On failure the error is reported and no session exists; the caller must
    /// retry with a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] if the token is empty or the gateway rejects
    /// either step.
    pub async fn initialize(&self, token: &ClientToken) -> Result<InstrumentSession, InitError> {
        let result = self.initialize_inner(token).await;
        if let Err(err) = &result {
            self.reporter.report(err, INIT_ERROR_CONTEXT);
        }
        result
    }

    async fn initialize_inner(&self, token: &ClientToken) -> Result<InstrumentSession, InitError> {
        if token.is_blank() {
            return Err(InitError::EmptyToken);
        }

        let client = self
            .gateway
            .create_client(token)
            .await
            .map_err(InitError::Client)?;
        tracing::debug!(
            merchant = client.merchant_id(),
            environment = client.environment(),
            "Created gateway client"
        );

        let options = self.config.instrument_options();
        let session = self
            .gateway
            .create_google_payment(&client, &options)
            .await
            .map_err(InitError::InstrumentSession)?;
        tracing::debug!(
            version = session.google_pay_version(),
            "Created Google Pay instrument session"
        );

        Ok(session.with_config(&self.config))
    }
}
