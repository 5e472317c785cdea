//! Tokenization result handling.
//!
//! The gateway embeds its token in the Google Pay response as a JSON string.
//! This module parses that token into a [`TokenizedPayment`] and decides which
//! [`Nonce`] the settlement call may use.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::error::TokenizationError;
use crate::proto::PaymentData;

/// Nonce substituted outside production so no real card is ever charged.
pub const SANDBOX_NONCE: &str = "fake-android-pay-nonce";

/// Single-use token representing authorized payment credentials.
///
/// Not `Clone`: a nonce is moved into exactly one settlement request.
#[derive(PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sandbox() {
            f.debug_tuple("Nonce").field(&self.0).finish()
        } else {
            f.debug_tuple("Nonce").field(&"<redacted>").finish()
        }
    }
}

impl Nonce {
    /// Wraps a raw nonce.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sandbox nonce literal.
    #[must_use]
    pub fn sandbox() -> Self {
        Self(SANDBOX_NONCE.to_owned())
    }

    /// Returns the raw nonce.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the sandbox literal.
    #[must_use]
    pub fn is_sandbox(&self) -> bool {
        self.0 == SANDBOX_NONCE
    }
}

/// Card details reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    /// Card brand, e.g. `"Visa"`.
    #[serde(default)]
    pub card_type: Option<String>,
    /// Last four digits.
    #[serde(default)]
    pub last_four: Option<String>,
    /// Last two digits.
    #[serde(default)]
    pub last_two: Option<String>,
    /// Whether the card is a device token rather than a stored PAN.
    #[serde(default)]
    pub is_network_tokenized: bool,
}

/// Card entry inside the gateway token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AndroidPayCard {
    nonce: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: CardDetails,
    #[serde(default)]
    bin_data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayToken {
    #[serde(default)]
    android_pay_cards: Vec<AndroidPayCard>,
}

/// Parsed gateway tokenization result.
#[derive(Debug, PartialEq, Eq)]
pub struct TokenizedPayment {
    /// Nonce as issued by the gateway.
    pub nonce: Nonce,
    /// Gateway payment type, e.g. `"AndroidPayCard"`.
    pub kind: Option<String>,
    /// User-facing card description.
    pub description: Option<String>,
    /// Card details.
    pub details: CardDetails,
    /// Issuer BIN data, if the gateway returned it.
    pub bin_data: Option<serde_json::Value>,
}

/// Parses the gateway token carried by `payment_data`.
///
/// # Errors
///
/// Returns [`TokenizationError`] if the token is not a gateway token, is not
/// valid JSON, or holds no usable card.
pub fn parse_response(payment_data: &PaymentData) -> Result<TokenizedPayment, TokenizationError> {
    let tokenization = &payment_data.payment_method_data.tokenization_data;
    if tokenization.kind != "PAYMENT_GATEWAY" {
        return Err(TokenizationError::UnexpectedTokenizationType(
            tokenization.kind.clone(),
        ));
    }

    let token: GatewayToken =
        serde_json::from_str(&tokenization.token).map_err(TokenizationError::MalformedToken)?;
    let card = token
        .android_pay_cards
        .into_iter()
        .next()
        .ok_or(TokenizationError::MissingCard)?;
    if card.nonce.trim().is_empty() {
        return Err(TokenizationError::EmptyNonce);
    }

    Ok(TokenizedPayment {
        nonce: Nonce(card.nonce),
        kind: card.kind,
        description: card.description,
        details: card.details,
        bin_data: card.bin_data,
    })
}

/// Picks the nonce that settlement may use.
///
/// The real nonce is used only when a merchant identifier is configured and
/// the environment is production; any other combination yields
/// [`SANDBOX_NONCE`].
#[must_use]
pub fn select_nonce(real: Nonce, environment: Environment, has_merchant_id: bool) -> Nonce {
    if has_merchant_id && environment == Environment::Production {
        real
    } else {
        Nonce::sandbox()
    }
}

/// Extracts the settlement nonce from a confirmed payment sheet.
///
/// # Errors
///
/// Returns [`TokenizationError`] if the response cannot be parsed. Nothing is
/// retained on failure.
pub fn extract_nonce(
    payment_data: &PaymentData,
    environment: Environment,
    has_merchant_id: bool,
) -> Result<Nonce, TokenizationError> {
    let tokenized = parse_response(payment_data)?;
    Ok(select_nonce(tokenized.nonce, environment, has_merchant_id))
}

/// Builds the gateway token JSON for a card nonce.
///
/// Used by test doubles that stand in for the gateway.
#[must_use]
pub fn gateway_token(nonce: &str, details: &CardDetails) -> String {
    serde_json::json!({
        "androidPayCards": [{
            "nonce": nonce,
            "type": "AndroidPayCard",
            "description": details
                .last_two
                .as_deref()
                .map_or_else(|| "Android Pay".to_owned(), |two| format!("ending in {two}")),
            "details": details,
        }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{PaymentMethodData, TokenizationData};

    fn payment_data(kind: &str, token: &str) -> PaymentData {
        PaymentData {
            api_version: 2,
            api_version_minor: 0,
            payment_method_data: PaymentMethodData {
                kind: "CARD".into(),
                description: None,
                info: None,
                tokenization_data: TokenizationData {
                    kind: kind.into(),
                    token: token.into(),
                },
            },
            email: None,
        }
    }

    fn visa() -> CardDetails {
        CardDetails {
            card_type: Some("Visa".into()),
            last_four: Some("1111".into()),
            last_two: Some("11".into()),
            is_network_tokenized: false,
        }
    }

    #[test]
    fn real_nonce_only_in_production_with_merchant() {
        let cases = [
            (true, Environment::Production, "tokencc_real"),
            (false, Environment::Production, SANDBOX_NONCE),
            (true, Environment::Test, SANDBOX_NONCE),
            (false, Environment::Test, SANDBOX_NONCE),
        ];
        for (has_merchant, env, expected) in cases {
            let nonce = select_nonce(Nonce::new("tokencc_real"), env, has_merchant);
            assert_eq!(nonce.as_str(), expected, "merchant={has_merchant} env={env}");
        }
    }

    #[test]
    fn parses_gateway_card() {
        let data = payment_data("PAYMENT_GATEWAY", &gateway_token("tokencc_real", &visa()));
        let parsed = parse_response(&data).unwrap();
        assert_eq!(parsed.nonce.as_str(), "tokencc_real");
        assert_eq!(parsed.kind.as_deref(), Some("AndroidPayCard"));
        assert_eq!(parsed.details.last_four.as_deref(), Some("1111"));
        assert_eq!(parsed.description.as_deref(), Some("ending in 11"));
    }

    #[test]
    fn extract_substitutes_sandbox_nonce_in_test() {
        let data = payment_data("PAYMENT_GATEWAY", &gateway_token("tokencc_real", &visa()));
        let nonce = extract_nonce(&data, Environment::Test, true).unwrap();
        assert!(nonce.is_sandbox());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(
            parse_response(&payment_data("DIRECT", "{}")),
            Err(TokenizationError::UnexpectedTokenizationType(_))
        ));
        assert!(matches!(
            parse_response(&payment_data("PAYMENT_GATEWAY", "not json")),
            Err(TokenizationError::MalformedToken(_))
        ));
        assert!(matches!(
            parse_response(&payment_data("PAYMENT_GATEWAY", r#"{"androidPayCards":[]}"#)),
            Err(TokenizationError::MissingCard)
        ));
        assert!(matches!(
            parse_response(&payment_data(
                "PAYMENT_GATEWAY",
                r#"{"androidPayCards":[{"nonce":" "}]}"#
            )),
            Err(TokenizationError::EmptyNonce)
        ));
    }

    #[test]
    fn real_nonce_is_redacted_in_debug() {
        assert!(!format!("{:?}", Nonce::new("tokencc_secret")).contains("secret"));
        assert!(format!("{:?}", Nonce::sandbox()).contains(SANDBOX_NONCE));
    }
}
