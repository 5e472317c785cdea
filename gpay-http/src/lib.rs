#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the Google Pay billing flow.
//!
//! Provides [`BillingClient`], a reqwest client for the account billing API
//! that implements [`gpay::settlement::BillingBackend`], and the
//! [`BearerAuth`] middleware that authenticates its requests.
//!
//! # Modules
//!
//! - [`auth`] - Bearer token middleware
//! - [`client`] - Billing API client
//! - [`constants`] - Endpoint paths and defaults
//! - [`error`] - Transport error types
//!
//! # Feature Flags
//!
//! - `telemetry` - Tracing spans around every API call

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;

pub use auth::BearerAuth;
pub use client::BillingClient;
pub use error::BillingClientError;
