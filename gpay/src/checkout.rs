//! Checkout attempt orchestration.
//!
//! A [`Checkout`] is one user-initiated payment attempt. It owns its
//! [`InstrumentSession`] and is consumed by [`Checkout::run`], so a nonce can
//! never leak into a second attempt.
//!
//! The attempt runs as a single sequential task with one suspend point per
//! provider or backend call:
//!
//! 1. Build the payment request from the instrument session
//! 2. Readiness check (terminal if the device is unsupported)
//! 3. Show the payment sheet; the provider calls the authorizer
//! 4. Extract the nonce
//! 5. Before-settlement hooks
//! 6. Settlement and cache invalidation
//! 7. After-settlement hooks and the success message

use std::fmt;
use std::sync::Arc;

use crate::adapter::InstrumentSession;
use crate::cache::CacheInvalidator;
use crate::config::GooglePayConfig;
use crate::error::{BuildError, CheckoutError, ReadinessError};
use crate::feedback::{CheckoutFeedback, ExceptionReporter, Severity, TracingReporter};
use crate::hooks::{CheckoutContext, CheckoutHooks, HookDecision};
use crate::proto::TransactionInfo;
use crate::provider::{AcceptAll, PaymentAuthorizer, PaymentsClient};
use crate::readiness::{build_request, check_ready};
use crate::settlement::{BillingBackend, PaymentAction, Settlement, SettlementDispatcher};
use crate::tokenize::extract_nonce;

/// Context attached to exception reports for failed attempts.
pub const CHECKOUT_ERROR_CONTEXT: &str = "Error completing Google Pay";

/// User-facing text for a failed attempt.
///
/// Device and initialization problems are shown as such; everything else
/// gets the action's generic failure message.
fn failure_message(action: PaymentAction, err: &CheckoutError) -> String {
    match err {
        CheckoutError::Readiness(ReadinessError::DeviceNotSupported)
        | CheckoutError::Build(BuildError::NotInitialized) => err.to_string(),
        _ => action.failure_message().to_owned(),
    }
}

/// How a checkout attempt ended.
#[derive(Debug)]
pub enum CheckoutOutcome {
    /// Settlement succeeded.
    Completed(Settlement),
    /// The user closed the payment sheet.
    Canceled,
    /// The attempt failed; the user was told and the error was reported.
    Failed(CheckoutError),
}

impl CheckoutOutcome {
    /// Whether settlement succeeded.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Assembles the collaborators of a checkout attempt.
pub struct CheckoutBuilder {
    config: GooglePayConfig,
    payments: Arc<dyn PaymentsClient>,
    backend: Arc<dyn BillingBackend>,
    cache: Arc<dyn CacheInvalidator>,
    authorizer: Arc<dyn PaymentAuthorizer>,
    reporter: Arc<dyn ExceptionReporter>,
    hooks: Vec<Arc<dyn CheckoutHooks>>,
    session: Option<InstrumentSession>,
}

impl fmt::Debug for CheckoutBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutBuilder")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl CheckoutBuilder {
    /// Starts a builder with the required collaborators.
    ///
    /// Defaults: [`AcceptAll`] authorizer, [`TracingReporter`], no hooks and
    /// no instrument session.
    pub fn new(
        config: GooglePayConfig,
        payments: Arc<dyn PaymentsClient>,
        backend: Arc<dyn BillingBackend>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            config,
            payments,
            backend,
            cache,
            authorizer: Arc::new(AcceptAll),
            reporter: Arc::new(TracingReporter),
            hooks: Vec::new(),
            session: None,
        }
    }

    /// Attaches the instrument session created by
    /// [`PaymentAdapter::initialize`](crate::adapter::PaymentAdapter::initialize).
    #[must_use]
    pub fn with_session(mut self, session: InstrumentSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Replaces the authorization callback.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: impl PaymentAuthorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    /// Replaces the exception reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Adds a lifecycle hook. Hooks execute in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: impl CheckoutHooks + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Checkout {
        Checkout {
            dispatcher: SettlementDispatcher::new(self.backend, self.cache),
            config: self.config,
            payments: self.payments,
            authorizer: self.authorizer,
            reporter: self.reporter,
            hooks: self.hooks,
            session: self.session,
        }
    }
}

/// One Google Pay checkout attempt.
pub struct Checkout {
    config: GooglePayConfig,
    payments: Arc<dyn PaymentsClient>,
    authorizer: Arc<dyn PaymentAuthorizer>,
    dispatcher: SettlementDispatcher,
    reporter: Arc<dyn ExceptionReporter>,
    hooks: Vec<Arc<dyn CheckoutHooks>>,
    session: Option<InstrumentSession>,
}

impl fmt::Debug for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkout")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl Checkout {
    /// Runs the attempt to completion, reporting progress through `feedback`.
    ///
    /// Failures are reported to the exception reporter and shown with
    /// [`Severity::Error`]. A canceled sheet ends silently.
    pub async fn run(
        self,
        action: PaymentAction,
        transaction_info: &TransactionInfo,
        feedback: &dyn CheckoutFeedback,
    ) -> CheckoutOutcome {
        let ctx = CheckoutContext {
            action,
            transaction_info,
        };
        let mut processing = false;

        match self.attempt(&ctx, feedback, &mut processing).await {
            Ok(settlement) => {
                feedback.set_message(
                    &settlement.success_message(),
                    Severity::Success,
                    settlement.warnings(),
                );
                CheckoutOutcome::Completed(settlement)
            }
            Err(err) => {
                if processing {
                    feedback.set_processing(false);
                }
                if err.is_canceled() {
                    tracing::debug!(action = %action, "Google Pay sheet closed by the user");
                    return CheckoutOutcome::Canceled;
                }
                self.reporter.report(&err, CHECKOUT_ERROR_CONTEXT);
                for hook in &self.hooks {
                    hook.on_checkout_failure(&ctx, &err).await;
                }
                feedback.set_message(&failure_message(action, &err), Severity::Error, &[]);
                CheckoutOutcome::Failed(err)
            }
        }
    }

    async fn attempt(
        &self,
        ctx: &CheckoutContext<'_>,
        feedback: &dyn CheckoutFeedback,
        processing: &mut bool,
    ) -> Result<Settlement, CheckoutError> {
        if ctx.action.requires_total_price() && ctx.transaction_info.total_price.is_none() {
            return Err(BuildError::MissingTotalPrice.into());
        }

        let request = build_request(self.session.as_ref(), ctx.transaction_info)?;
        check_ready(self.payments.as_ref(), &request).await?;

        tracing::debug!(action = %ctx.action, "Showing Google Pay sheet");
        let payment_data = self
            .payments
            .load_payment_data(&request, self.authorizer.as_ref())
            .await?;

        let nonce = extract_nonce(
            &payment_data,
            self.config.environment,
            self.config.has_merchant_id(),
        )?;
        drop(payment_data);

        for hook in &self.hooks {
            if let HookDecision::Abort { reason, message } = hook.before_settlement(ctx).await {
                return Err(CheckoutError::Aborted { reason, message });
            }
        }

        feedback.set_processing(true);
        *processing = true;

        let settlement = self
            .dispatcher
            .dispatch(ctx.action, ctx.transaction_info, nonce)
            .await?;

        feedback.set_processing(false);
        *processing = false;

        for hook in &self.hooks {
            hook.after_settlement(ctx, &settlement).await;
        }
        Ok(settlement)
    }
}
