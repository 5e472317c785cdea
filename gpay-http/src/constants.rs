//! Billing API endpoints and defaults.

/// Default base URL of the billing API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.linode.com/v4/";

/// Issues a client token for one checkout attempt.
pub const CLIENT_TOKEN_PATH: &str = "./account/client-token";

/// Submits and lists one-time payments.
pub const PAYMENTS_PATH: &str = "./account/payments";

/// Stores and lists payment methods.
pub const PAYMENT_METHODS_PATH: &str = "./account/payment-methods";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
