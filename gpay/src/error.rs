//! Error types for the Google Pay checkout flow.
//!
//! Each step of a checkout attempt has its own error type. [`CheckoutError`]
//! aggregates them and carries the [`CheckoutError::Canceled`] variant, which
//! marks a user-initiated abort rather than a fault.

/// Boxed error returned by external collaborators (gateway, billing backend).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by the payment provider SDK.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The user dismissed the payment sheet.
    #[error("payment sheet closed by the user")]
    Canceled,

    /// The provider rejected the operation.
    #[error("{status_code}: {message}")]
    Rejected {
        /// Provider status code, e.g. `"DEVELOPER_ERROR"`.
        status_code: String,
        /// Provider message.
        message: String,
    },
}

impl ProviderError {
    /// Creates a rejection with the given status code and message.
    #[must_use]
    pub fn rejected(status_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status_code: status_code.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a user cancellation.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// The gateway session could not be established.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// No client token was supplied.
    #[error("client token is empty")]
    EmptyToken,

    /// The gateway client could not be created from the token.
    #[error("failed to create gateway client: {0}")]
    Client(#[source] ProviderError),

    /// The Google Pay instrument session could not be created.
    #[error("failed to create Google Pay session: {0}")]
    InstrumentSession(#[source] ProviderError),
}

/// The payment request could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// No instrument session is attached to the checkout.
    #[error("Unable to initialize Google Pay")]
    NotInitialized,

    /// The transaction needs a total price but has none.
    #[error("transaction is missing a total price")]
    MissingTotalPrice,

    /// The total price is not a non-negative decimal amount.
    #[error("invalid total price '{0}'")]
    InvalidTotalPrice(String),

    /// The currency code is not an ISO 4217 code.
    #[error("invalid currency code '{0}'")]
    InvalidCurrencyCode(String),

    /// The country code is not an ISO 3166-1 alpha-2 code.
    #[error("invalid country code '{0}'")]
    InvalidCountryCode(String),
}

/// The device cannot present the payment sheet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadinessError {
    /// The provider reports that Google Pay is unavailable on this device.
    #[error("Your device does not support Google Pay.")]
    DeviceNotSupported,

    /// The readiness query itself failed.
    #[error("readiness check failed: {0}")]
    Provider(#[source] ProviderError),
}

/// The nonce could not be extracted from the provider response.
#[derive(Debug, thiserror::Error)]
pub enum TokenizationError {
    /// The tokenization data is not of the gateway type.
    #[error("unexpected tokenization type '{0}'")]
    UnexpectedTokenizationType(String),

    /// The gateway token is not valid JSON of the expected shape.
    #[error("malformed gateway token: {0}")]
    MalformedToken(#[source] serde_json::Error),

    /// The gateway token holds no card.
    #[error("gateway token contains no payment card")]
    MissingCard,

    /// The card entry has an empty nonce.
    #[error("gateway token contains an empty nonce")]
    EmptyNonce,
}

/// The billing backend call failed.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// The one-time charge was refused or could not be sent.
    #[error("payment submission failed: {0}")]
    Charge(#[source] BoxError),

    /// The payment method could not be stored.
    #[error("payment method registration failed: {0}")]
    Register(#[source] BoxError),

    /// A one-time charge was requested without an amount.
    #[error("one-time payment requires a total price")]
    MissingAmount,
}

/// Any failure of a checkout attempt.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Request construction failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The device is not ready to pay.
    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    /// The payment sheet failed.
    #[error("Google Pay failed: {0}")]
    Provider(#[source] ProviderError),

    /// No nonce could be extracted.
    #[error(transparent)]
    Tokenization(#[from] TokenizationError),

    /// The backend call failed.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// A lifecycle hook aborted the attempt before settlement.
    #[error("checkout aborted: {reason}: {message}")]
    Aborted {
        /// Machine-readable abort reason.
        reason: String,
        /// Human-readable abort message.
        message: String,
    },

    /// The user closed the payment sheet. Not reported as an error.
    #[error("checkout canceled by the user")]
    Canceled,
}

impl From<ProviderError> for CheckoutError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Canceled => Self::Canceled,
            other => Self::Provider(other),
        }
    }
}

impl CheckoutError {
    /// Whether the attempt ended because the user canceled.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canceled_provider_error_maps_to_canceled_checkout() {
        let err: CheckoutError = ProviderError::Canceled.into();
        assert!(err.is_canceled());
    }

    #[test]
    fn rejected_provider_error_is_a_failure() {
        let err: CheckoutError = ProviderError::rejected("INTERNAL_ERROR", "boom").into();
        assert!(!err.is_canceled());
        assert_eq!(err.to_string(), "Google Pay failed: INTERNAL_ERROR: boom");
    }

    #[test]
    fn device_not_supported_message_is_user_facing() {
        assert_eq!(
            ReadinessError::DeviceNotSupported.to_string(),
            "Your device does not support Google Pay."
        );
    }
}
