//! Settlement dispatcher.
//!
//! Given a nonce, either charges the account once or stores the card as the
//! default payment method. Cached billing data is invalidated only after the
//! backend call itself succeeds.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::billing::{AddPaymentMethodRequest, MakePaymentRequest, Payment, Warning};
use crate::cache::{CacheInvalidator, CacheKey};
use crate::error::{BoxError, SettlementError};
use crate::proto::TransactionInfo;
use crate::tokenize::Nonce;

/// What the checkout attempt does with the nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentAction {
    /// Charge the account once.
    OneTimePayment,
    /// Store the card as the default payment method.
    AddRecurringPayment,
}

impl PaymentAction {
    /// The wire spelling, e.g. `"one-time-payment"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneTimePayment => "one-time-payment",
            Self::AddRecurringPayment => "add-recurring-payment",
        }
    }

    /// Whether the action needs an amount to charge.
    #[must_use]
    pub const fn requires_total_price(self) -> bool {
        matches!(self, Self::OneTimePayment)
    }

    /// The cache key made stale by a successful settlement.
    #[must_use]
    pub const fn cache_key(self) -> CacheKey {
        match self {
            Self::OneTimePayment => CacheKey::BillingPayments,
            Self::AddRecurringPayment => CacheKey::PaymentMethodsAll,
        }
    }

    /// User-facing message shown when the attempt fails.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::OneTimePayment => "Unable to complete Google Pay payment",
            Self::AddRecurringPayment => "Unable to add payment method",
        }
    }
}

impl fmt::Display for PaymentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-time-payment" => Ok(Self::OneTimePayment),
            "add-recurring-payment" => Ok(Self::AddRecurringPayment),
            other => Err(format!("unknown payment action '{other}'")),
        }
    }
}

/// Billing API operations used by settlement.
#[async_trait]
pub trait BillingBackend: Send + Sync {
    /// Submits a one-time charge.
    async fn make_payment(&self, request: MakePaymentRequest) -> Result<Payment, BoxError>;

    /// Stores a payment method.
    async fn add_payment_method(&self, request: AddPaymentMethodRequest) -> Result<(), BoxError>;
}

#[async_trait]
impl<T: BillingBackend + ?Sized> BillingBackend for Arc<T> {
    async fn make_payment(&self, request: MakePaymentRequest) -> Result<Payment, BoxError> {
        (**self).make_payment(request).await
    }

    async fn add_payment_method(&self, request: AddPaymentMethodRequest) -> Result<(), BoxError> {
        (**self).add_payment_method(request).await
    }
}

/// A completed settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The account was charged.
    Charged {
        /// Amount as supplied by the caller, e.g. `"10.00"`.
        amount: String,
        /// Payment recorded by the backend.
        payment: Payment,
    },
    /// The card was stored as the default payment method.
    MethodAdded,
}

impl Settlement {
    /// User-facing success message.
    #[must_use]
    pub fn success_message(&self) -> String {
        match self {
            Self::Charged { amount, .. } => {
                format!("Payment for ${amount} successfully submitted with Google Pay")
            }
            Self::MethodAdded => "Successfully added Google Pay".to_owned(),
        }
    }

    /// Warnings returned by the backend.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Charged { payment, .. } => &payment.warnings,
            Self::MethodAdded => &[],
        }
    }

    /// The action this settlement completed.
    #[must_use]
    pub const fn action(&self) -> PaymentAction {
        match self {
            Self::Charged { .. } => PaymentAction::OneTimePayment,
            Self::MethodAdded => PaymentAction::AddRecurringPayment,
        }
    }
}

/// Routes a nonce to the backend call selected by the [`PaymentAction`].
#[derive(Clone)]
pub struct SettlementDispatcher {
    backend: Arc<dyn BillingBackend>,
    cache: Arc<dyn CacheInvalidator>,
}

impl fmt::Debug for SettlementDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlementDispatcher").finish_non_exhaustive()
    }
}

impl SettlementDispatcher {
    /// Creates a dispatcher over a backend and a cache.
    pub fn new(backend: Arc<dyn BillingBackend>, cache: Arc<dyn CacheInvalidator>) -> Self {
        Self { backend, cache }
    }

    /// Settles `nonce` according to `action`.
    ///
    /// Consumes the nonce. On success the matching cache key is invalidated
    /// exactly once; on failure nothing is invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError`] if the backend call fails or a one-time
    /// payment has no amount.
    pub async fn dispatch(
        &self,
        action: PaymentAction,
        transaction_info: &TransactionInfo,
        nonce: Nonce,
    ) -> Result<Settlement, SettlementError> {
        let settlement = match action {
            PaymentAction::OneTimePayment => {
                let amount = transaction_info
                    .total_price
                    .clone()
                    .ok_or(SettlementError::MissingAmount)?;
                let payment = self
                    .backend
                    .make_payment(MakePaymentRequest {
                        usd: amount.clone(),
                        nonce,
                    })
                    .await
                    .map_err(SettlementError::Charge)?;
                tracing::info!(payment_id = payment.id, %amount, "Google Pay payment submitted");
                Settlement::Charged { amount, payment }
            }
            PaymentAction::AddRecurringPayment => {
                self.backend
                    .add_payment_method(AddPaymentMethodRequest::default_method(nonce))
                    .await
                    .map_err(SettlementError::Register)?;
                tracing::info!("Google Pay payment method added");
                Settlement::MethodAdded
            }
        };

        self.cache.invalidate(action.cache_key());
        Ok(settlement)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use super::*;

    /// Backend double that records requests and replays scripted answers.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub(crate) fail: bool,
        pub(crate) warnings: Vec<Warning>,
        pub(crate) payments: Mutex<Vec<(String, String)>>,
        pub(crate) methods: Mutex<Vec<(String, bool)>>,
    }

    #[async_trait]
    impl BillingBackend for RecordingBackend {
        async fn make_payment(&self, request: MakePaymentRequest) -> Result<Payment, BoxError> {
            self.payments
                .lock()
                .unwrap()
                .push((request.usd.clone(), request.nonce.as_str().to_owned()));
            if self.fail {
                return Err("card declined".into());
            }
            Ok(Payment {
                id: 1,
                date: "2026-10-16T00:00:00".into(),
                usd: request.usd.parse::<Decimal>()?,
                warnings: self.warnings.clone(),
            })
        }

        async fn add_payment_method(
            &self,
            request: AddPaymentMethodRequest,
        ) -> Result<(), BoxError> {
            self.methods
                .lock()
                .unwrap()
                .push((request.data.nonce.as_str().to_owned(), request.is_default));
            if self.fail {
                return Err("gateway rejected nonce".into());
            }
            Ok(())
        }
    }

    /// Cache double that records invalidated keys.
    #[derive(Default)]
    pub(crate) struct RecordingCache {
        pub(crate) keys: Mutex<Vec<CacheKey>>,
    }

    impl CacheInvalidator for RecordingCache {
        fn invalidate(&self, key: CacheKey) {
            self.keys.lock().unwrap().push(key);
        }
    }

    fn dispatcher(
        backend: RecordingBackend,
    ) -> (SettlementDispatcher, Arc<RecordingBackend>, Arc<RecordingCache>) {
        let backend = Arc::new(backend);
        let cache = Arc::new(RecordingCache::default());
        (
            SettlementDispatcher::new(backend.clone(), cache.clone()),
            backend,
            cache,
        )
    }

    #[tokio::test]
    async fn one_time_payment_invalidates_billing_payments_once() {
        let (dispatcher, backend, cache) = dispatcher(RecordingBackend::default());
        let settlement = dispatcher
            .dispatch(
                PaymentAction::OneTimePayment,
                &TransactionInfo::final_price("10.00", "USD"),
                Nonce::sandbox(),
            )
            .await
            .unwrap();

        assert_eq!(
            settlement.success_message(),
            "Payment for $10.00 successfully submitted with Google Pay"
        );
        assert_eq!(
            *backend.payments.lock().unwrap(),
            vec![("10.00".to_owned(), "fake-android-pay-nonce".to_owned())]
        );
        assert_eq!(*cache.keys.lock().unwrap(), vec![CacheKey::BillingPayments]);
    }

    #[tokio::test]
    async fn recurring_payment_stores_default_method() {
        let (dispatcher, backend, cache) = dispatcher(RecordingBackend::default());
        let settlement = dispatcher
            .dispatch(
                PaymentAction::AddRecurringPayment,
                &TransactionInfo::not_currently_known("USD"),
                Nonce::new("tokencc_real"),
            )
            .await
            .unwrap();

        assert_eq!(settlement, Settlement::MethodAdded);
        assert_eq!(settlement.success_message(), "Successfully added Google Pay");
        assert_eq!(
            *backend.methods.lock().unwrap(),
            vec![("tokencc_real".to_owned(), true)]
        );
        assert_eq!(*cache.keys.lock().unwrap(), vec![CacheKey::PaymentMethodsAll]);
    }

    #[tokio::test]
    async fn failed_charge_leaves_cache_untouched() {
        let (dispatcher, _, cache) = dispatcher(RecordingBackend {
            fail: true,
            ..RecordingBackend::default()
        });
        let err = dispatcher
            .dispatch(
                PaymentAction::OneTimePayment,
                &TransactionInfo::final_price("10.00", "USD"),
                Nonce::sandbox(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::Charge(_)));
        assert!(cache.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_time_payment_without_amount_never_reaches_backend() {
        let (dispatcher, backend, _) = dispatcher(RecordingBackend::default());
        let err = dispatcher
            .dispatch(
                PaymentAction::OneTimePayment,
                &TransactionInfo::not_currently_known("USD"),
                Nonce::sandbox(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::MissingAmount));
        assert!(backend.payments.lock().unwrap().is_empty());
    }

    #[test]
    fn action_parses_wire_spelling() {
        assert_eq!(
            "one-time-payment".parse::<PaymentAction>(),
            Ok(PaymentAction::OneTimePayment)
        );
        assert_eq!(
            serde_json::to_value(PaymentAction::AddRecurringPayment).unwrap(),
            "add-recurring-payment"
        );
        assert!("refund".parse::<PaymentAction>().is_err());
    }
}
