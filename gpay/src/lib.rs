#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the Google Pay billing checkout flow.
//!
//! This crate drives a single Google Pay checkout attempt that is tokenized
//! through a payment-gateway SDK and settled against a cloud account billing
//! API. It is transport-agnostic: the gateway, the Google Pay payments client,
//! the billing backend and the local query cache are all collaborators
//! expressed as traits.
//!
//! # Overview
//!
//! A checkout attempt is strictly sequential:
//!
//! 1. [`adapter::PaymentAdapter`] turns a client token into an
//!    [`adapter::InstrumentSession`].
//! 2. [`readiness`] builds the payment request and asks the payments client
//!    whether the device can pay.
//! 3. The payment sheet is shown; the provider calls back into a
//!    [`provider::PaymentAuthorizer`] when the user confirms.
//! 4. [`tokenize`] extracts the single-use nonce from the provider response.
//! 5. [`settlement::SettlementDispatcher`] charges the account or stores the
//!    payment method, then invalidates cached billing data.
//!
//! [`checkout::Checkout`] wires the steps together.
//!
//! # Modules
//!
//! - [`adapter`] - Gateway SDK adapter and the per-attempt instrument session
//! - [`billing`] - Billing API request and response types
//! - [`cache`] - Query cache and invalidation keys
//! - [`checkout`] - Checkout attempt orchestration and builder
//! - [`config`] - Merchant and environment configuration
//! - [`error`] - Error taxonomy for every step of the flow
//! - [`feedback`] - User feedback and exception reporting collaborators
//! - [`hooks`] - Lifecycle hooks around settlement
//! - [`proto`] - Google Pay API wire types
//! - [`provider`] - Payment provider SDK traits
//! - [`readiness`] - Request building and readiness gate
//! - [`settlement`] - Settlement dispatcher
//! - [`tokenize`] - Nonce extraction and selection
//!
//! # Feature Flags
//!
//! - `sandbox` - Scripted gateway and payments client for tests and tooling

pub mod adapter;
pub mod billing;
pub mod cache;
pub mod checkout;
pub mod config;
pub mod error;
pub mod feedback;
pub mod hooks;
pub mod proto;
pub mod provider;
pub mod readiness;
#[cfg(feature = "sandbox")]
pub mod sandbox;
pub mod settlement;
pub mod tokenize;

pub use checkout::{Checkout, CheckoutBuilder, CheckoutOutcome};
pub use error::CheckoutError;
