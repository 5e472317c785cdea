//! Request building and the readiness gate.
//!
//! No nonce may be requested before [`check_ready`] succeeds. A device that
//! is not ready is a capability limit, so the gate fails terminally instead
//! of retrying.

use crate::adapter::InstrumentSession;
use crate::error::{BuildError, ReadinessError};
use crate::proto::{IsReadyToPayRequest, PaymentDataRequest, TransactionInfo};
use crate::provider::PaymentsClient;

/// Builds the payment data request for `transaction_info`.
///
/// # Errors
///
/// Returns [`BuildError::NotInitialized`] when no instrument session exists,
/// or a validation error from the session.
pub fn build_request(
    session: Option<&InstrumentSession>,
    transaction_info: &TransactionInfo,
) -> Result<PaymentDataRequest, BuildError> {
    session
        .ok_or(BuildError::NotInitialized)?
        .create_payment_data_request(transaction_info)
}

/// Asks the payments client whether the device can pay for `request`.
///
/// # Errors
///
/// Returns [`ReadinessError::DeviceNotSupported`] if the provider answers
/// `false`, or [`ReadinessError::Provider`] if the query fails.
pub async fn check_ready(
    payments: &dyn PaymentsClient,
    request: &PaymentDataRequest,
) -> Result<(), ReadinessError> {
    let query = IsReadyToPayRequest::for_payment(request);
    let response = payments
        .is_ready_to_pay(&query)
        .await
        .map_err(ReadinessError::Provider)?;
    if response.result {
        Ok(())
    } else {
        tracing::warn!(
            payment_method_present = ?response.payment_method_present,
            "Google Pay is not available on this device"
        );
        Err(ReadinessError::DeviceNotSupported)
    }
}
