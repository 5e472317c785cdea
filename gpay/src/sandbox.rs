//! Scripted payment provider for tests and tooling.
//!
//! [`SandboxGateway`] accepts any well-formed client token or tokenization key
//! and [`SandboxPaymentsClient`] plays back a scripted payment sheet, invoking
//! the authorization callback exactly like the real payments client does.
//! Both record what they were asked so tests can assert on the protocol.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::adapter::{ClientToken, GatewayClient, InstrumentSession};
use crate::config::InstrumentOptions;
use crate::error::ProviderError;
use crate::proto::{
    API_VERSION, API_VERSION_MINOR, CardInfo, IsReadyToPayRequest, IsReadyToPayResponse,
    PaymentData, PaymentDataRequest, PaymentMethodData, TokenizationData,
};
use crate::provider::{BoxFuture, PaymentAuthorizer, PaymentGateway, PaymentsClient};
use crate::tokenize::{CardDetails, gateway_token};

/// Google Pay versions the sandbox gateway supports.
pub const SUPPORTED_GOOGLE_PAY_VERSIONS: &[u8] = &[2];

/// Sandbox gateway SDK.
#[derive(Debug, Default)]
pub struct SandboxGateway {
    client_error: Option<ProviderError>,
}

impl SandboxGateway {
    /// A gateway that accepts valid authorizations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose client creation always fails with `error`.
    #[must_use]
    pub fn failing(error: ProviderError) -> Self {
        Self {
            client_error: Some(error),
        }
    }
}

impl PaymentGateway for SandboxGateway {
    fn create_client<'a>(
        &'a self,
        token: &'a ClientToken,
    ) -> BoxFuture<'a, Result<GatewayClient, ProviderError>> {
        Box::pin(async move {
            if let Some(err) = &self.client_error {
                return Err(err.clone());
            }
            GatewayClient::from_token(token)
        })
    }

    fn create_google_payment<'a>(
        &'a self,
        client: &'a GatewayClient,
        options: &'a InstrumentOptions,
    ) -> BoxFuture<'a, Result<InstrumentSession, ProviderError>> {
        Box::pin(async move {
            if !SUPPORTED_GOOGLE_PAY_VERSIONS.contains(&options.google_pay_version) {
                return Err(ProviderError::rejected(
                    "GOOGLE_PAYMENT_UNSUPPORTED_VERSION",
                    format!(
                        "The Google Pay version {} is not supported.",
                        options.google_pay_version
                    ),
                ));
            }
            Ok(InstrumentSession::new(client.clone(), options))
        })
    }
}

/// What the user does with the payment sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOutcome {
    /// The user confirms a card; the gateway issues `nonce`.
    Approve {
        /// Gateway nonce for the card.
        nonce: String,
        /// Card details embedded in the gateway token.
        details: CardDetails,
    },
    /// The user closes the sheet.
    Cancel,
    /// The sheet fails with a provider status.
    Fail(ProviderError),
}

impl SheetOutcome {
    /// The user confirms a test Visa card.
    #[must_use]
    pub fn approve(nonce: impl Into<String>) -> Self {
        Self::Approve {
            nonce: nonce.into(),
            details: CardDetails {
                card_type: Some("Visa".to_owned()),
                last_four: Some("1111".to_owned()),
                last_two: Some("11".to_owned()),
                is_network_tokenized: false,
            },
        }
    }
}

/// Sandbox Google Pay payments client.
#[derive(Debug)]
pub struct SandboxPaymentsClient {
    ready: bool,
    outcome: SheetOutcome,
    readiness_queries: Mutex<Vec<IsReadyToPayRequest>>,
    sheet_requests: Mutex<Vec<PaymentDataRequest>>,
    authorizations: AtomicUsize,
}

impl SandboxPaymentsClient {
    /// A ready device whose sheet ends with `outcome`.
    #[must_use]
    pub fn new(outcome: SheetOutcome) -> Self {
        Self {
            ready: true,
            outcome,
            readiness_queries: Mutex::new(Vec::new()),
            sheet_requests: Mutex::new(Vec::new()),
            authorizations: AtomicUsize::new(0),
        }
    }

    /// Sets the readiness answer.
    #[must_use]
    pub const fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    /// Readiness queries received so far.
    #[must_use]
    pub fn readiness_queries(&self) -> Vec<IsReadyToPayRequest> {
        self.readiness_queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Payment sheet requests received so far.
    #[must_use]
    pub fn sheet_requests(&self) -> Vec<PaymentDataRequest> {
        self.sheet_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times the payment sheet was shown.
    #[must_use]
    pub fn sheet_loads(&self) -> usize {
        self.sheet_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of times the authorization callback was invoked.
    #[must_use]
    pub fn authorizations(&self) -> usize {
        self.authorizations.load(Ordering::SeqCst)
    }
}

fn approved_payment_data(nonce: &str, details: &CardDetails) -> PaymentData {
    PaymentData {
        api_version: API_VERSION,
        api_version_minor: API_VERSION_MINOR,
        payment_method_data: PaymentMethodData {
            kind: "CARD".to_owned(),
            description: details
                .last_four
                .as_deref()
                .map(|four| format!("Visa •••• {four}")),
            info: Some(CardInfo {
                card_network: details.card_type.as_deref().map(str::to_ascii_uppercase),
                card_details: details.last_four.clone(),
            }),
            tokenization_data: TokenizationData {
                kind: "PAYMENT_GATEWAY".to_owned(),
                token: gateway_token(nonce, details),
            },
        },
        email: None,
    }
}

impl PaymentsClient for SandboxPaymentsClient {
    fn is_ready_to_pay<'a>(
        &'a self,
        request: &'a IsReadyToPayRequest,
    ) -> BoxFuture<'a, Result<IsReadyToPayResponse, ProviderError>> {
        Box::pin(async move {
            self.readiness_queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            Ok(IsReadyToPayResponse {
                result: self.ready,
                payment_method_present: Some(self.ready),
            })
        })
    }

    fn load_payment_data<'a>(
        &'a self,
        request: &'a PaymentDataRequest,
        authorizer: &'a dyn PaymentAuthorizer,
    ) -> BoxFuture<'a, Result<PaymentData, ProviderError>> {
        Box::pin(async move {
            self.sheet_requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            match &self.outcome {
                SheetOutcome::Cancel => Err(ProviderError::Canceled),
                SheetOutcome::Fail(err) => Err(err.clone()),
                SheetOutcome::Approve { nonce, details } => {
                    let data = approved_payment_data(nonce, details);
                    self.authorizations.fetch_add(1, Ordering::SeqCst);
                    let result = authorizer.on_payment_authorized(&data);
                    if result.is_success() {
                        Ok(data)
                    } else {
                        let (reason, message) = result.error.map_or_else(
                            || ("PAYMENT_DATA_INVALID".to_owned(), String::new()),
                            |e| (e.reason, e.message),
                        );
                        Err(ProviderError::rejected(reason, message))
                    }
                }
            }
        })
    }
}
