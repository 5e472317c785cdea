//! Lifecycle hooks for checkout attempts.
//!
//! Hooks intercept a checkout at three points:
//!
//! - **Before settlement**: Inspect the attempt once a nonce exists, or abort it
//! - **After settlement**: Observe a completed settlement
//! - **On failure**: Observe a failed attempt (cancellations are not failures)
//!
//! All methods of [`CheckoutHooks`] default to no-ops; implement only what you
//! need. Hooks run in registration order and the first abort wins.

use std::fmt::{self, Debug};

use crate::error::CheckoutError;
use crate::proto::TransactionInfo;
use crate::provider::BoxFuture;
use crate::settlement::{PaymentAction, Settlement};

/// Decision returned by [`CheckoutHooks::before_settlement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Proceed with settlement.
    Continue,
    /// Abort the attempt; it is reported as a failure.
    Abort {
        /// Machine-readable reason, e.g. `"spend_limit"`.
        reason: String,
        /// Human-readable message.
        message: String,
    },
}

/// Context shared by all hooks of one attempt.
///
/// The nonce is deliberately absent: hooks never see payment credentials.
pub struct CheckoutContext<'a> {
    /// What the attempt does.
    pub action: PaymentAction,
    /// Transaction being paid.
    pub transaction_info: &'a TransactionInfo,
}

impl Debug for CheckoutContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutContext")
            .field("action", &self.action)
            .field("total_price", &self.transaction_info.total_price)
            .finish()
    }
}

/// Lifecycle hooks around settlement.
pub trait CheckoutHooks: Send + Sync {
    /// Called after a nonce is obtained and before the backend call.
    fn before_settlement<'a>(
        &'a self,
        _ctx: &'a CheckoutContext<'a>,
    ) -> BoxFuture<'a, HookDecision> {
        Box::pin(async { HookDecision::Continue })
    }

    /// Called after a successful settlement and cache invalidation.
    fn after_settlement<'a>(
        &'a self,
        _ctx: &'a CheckoutContext<'a>,
        _settlement: &'a Settlement,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called when the attempt fails for any reason other than cancellation.
    fn on_checkout_failure<'a>(
        &'a self,
        _ctx: &'a CheckoutContext<'a>,
        _error: &'a CheckoutError,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}
