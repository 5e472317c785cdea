//! Payment provider SDK seams.
//!
//! Two external SDKs take part in a checkout: the payment gateway, which owns
//! client sessions and tokenization, and the Google Pay payments client, which
//! answers readiness queries and shows the payment sheet. Both are modelled as
//! dyn-compatible traits returning boxed futures so they can be shared behind
//! `Arc` across attempts.

use std::future::Future;
use std::pin::Pin;

use crate::adapter::{ClientToken, GatewayClient, InstrumentSession};
use crate::config::InstrumentOptions;
use crate::error::ProviderError;
use crate::proto::{
    IsReadyToPayRequest, IsReadyToPayResponse, PaymentAuthorizationResult, PaymentData,
    PaymentDataRequest,
};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Gateway SDK: creates clients and Google Pay sessions.
pub trait PaymentGateway: Send + Sync {
    /// Creates a gateway client authorized by `token`.
    fn create_client<'a>(
        &'a self,
        token: &'a ClientToken,
    ) -> BoxFuture<'a, Result<GatewayClient, ProviderError>>;

    /// Creates a Google Pay session scoped to `client` and the merchant in
    /// `options`.
    fn create_google_payment<'a>(
        &'a self,
        client: &'a GatewayClient,
        options: &'a InstrumentOptions,
    ) -> BoxFuture<'a, Result<InstrumentSession, ProviderError>>;
}

/// Google Pay payments client: readiness queries and the payment sheet.
pub trait PaymentsClient: Send + Sync {
    /// Asks whether the device can pay with the given methods.
    fn is_ready_to_pay<'a>(
        &'a self,
        request: &'a IsReadyToPayRequest,
    ) -> BoxFuture<'a, Result<IsReadyToPayResponse, ProviderError>>;

    /// Shows the payment sheet and resolves once the user confirms or closes it.
    ///
    /// Implementations invoke `authorizer` while the sheet is open and only
    /// resolve with the payment data if it accepts. A closed sheet resolves to
    /// [`ProviderError::Canceled`].
    fn load_payment_data<'a>(
        &'a self,
        request: &'a PaymentDataRequest,
        authorizer: &'a dyn PaymentAuthorizer,
    ) -> BoxFuture<'a, Result<PaymentData, ProviderError>>;
}

/// Merchant-side `onPaymentAuthorized` callback.
///
/// Called synchronously by the payments client when the user confirms the
/// sheet; the returned result decides whether the sheet closes successfully.
pub trait PaymentAuthorizer: Send + Sync {
    /// Accepts or refuses the confirmed payment.
    fn on_payment_authorized(&self, payment_data: &PaymentData) -> PaymentAuthorizationResult;
}

/// Authorizer that accepts every confirmed payment.
///
/// Fraud and risk checks happen server-side during settlement.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PaymentAuthorizer for AcceptAll {
    fn on_payment_authorized(&self, _payment_data: &PaymentData) -> PaymentAuthorizationResult {
        PaymentAuthorizationResult::success()
    }
}

impl<F> PaymentAuthorizer for F
where
    F: Fn(&PaymentData) -> PaymentAuthorizationResult + Send + Sync,
{
    fn on_payment_authorized(&self, payment_data: &PaymentData) -> PaymentAuthorizationResult {
        self(payment_data)
    }
}
