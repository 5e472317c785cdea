//! Merchant and environment configuration for Google Pay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::proto::{CardNetwork, MerchantInfo};

/// Google Pay environment the payments client runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    /// Test cards only; no real money moves.
    #[default]
    Test,
    /// Live payments.
    Production,
}

impl Environment {
    /// The Google Pay spelling of this environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "TEST",
            Self::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEST" => Ok(Self::Test),
            "PRODUCTION" => Ok(Self::Production),
            other => Err(format!("expected TEST or PRODUCTION, got '{other}'")),
        }
    }
}

/// Options used to create an instrument session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentOptions {
    /// Google Pay API version requested from the gateway SDK.
    pub google_pay_version: u8,
    /// Google merchant identifier, if configured.
    pub google_merchant_id: Option<String>,
}

/// Configuration for the Google Pay checkout.
///
/// # Example
///
/// ```rust
/// use gpay::config::{Environment, GooglePayConfig};
///
/// let config: GooglePayConfig = serde_json::from_value(serde_json::json!({
///     "merchant_id": "BCR2DN4T000000",
///     "environment": "PRODUCTION",
/// }))
/// .unwrap();
/// assert_eq!(config.environment, Environment::Production);
/// assert_eq!(config.google_pay_version, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GooglePayConfig {
    /// Google merchant identifier. Required for real nonces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,

    /// Name shown on the payment sheet.
    #[serde(default = "default_merchant_name")]
    pub merchant_name: String,

    /// Payments client environment (default: `TEST`).
    #[serde(default)]
    pub environment: Environment,

    /// Google Pay API version requested from the gateway (default: `2`).
    #[serde(default = "default_google_pay_version")]
    pub google_pay_version: u8,

    /// Accepted card networks.
    #[serde(default = "default_card_networks")]
    pub allowed_card_networks: Vec<CardNetwork>,

    /// Whether the sheet collects a billing address.
    #[serde(default)]
    pub billing_address_required: bool,
}

fn default_merchant_name() -> String {
    "Cloud Manager".to_owned()
}

const fn default_google_pay_version() -> u8 {
    2
}

fn default_card_networks() -> Vec<CardNetwork> {
    CardNetwork::DEFAULT.to_vec()
}

impl Default for GooglePayConfig {
    fn default() -> Self {
        Self {
            merchant_id: None,
            merchant_name: default_merchant_name(),
            environment: Environment::default(),
            google_pay_version: default_google_pay_version(),
            allowed_card_networks: default_card_networks(),
            billing_address_required: false,
        }
    }
}

impl GooglePayConfig {
    /// Whether a non-empty merchant identifier is configured.
    #[must_use]
    pub fn has_merchant_id(&self) -> bool {
        self.merchant_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Whether the payments client runs in production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Options for [`crate::adapter::PaymentAdapter::initialize`].
    #[must_use]
    pub fn instrument_options(&self) -> InstrumentOptions {
        InstrumentOptions {
            google_pay_version: self.google_pay_version,
            google_merchant_id: self.merchant_id.clone().filter(|id| !id.is_empty()),
        }
    }

    /// Merchant information for payment requests.
    #[must_use]
    pub fn merchant_info(&self) -> MerchantInfo {
        MerchantInfo {
            merchant_id: self.merchant_id.clone().filter(|id| !id.is_empty()),
            merchant_name: self.merchant_name.clone(),
        }
    }
}
