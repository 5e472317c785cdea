//! Operator CLI for the Google Pay billing flow.
//!
//! Runs checkout attempts against the billing API with the sandbox payment
//! provider standing in for the device wallet, and inspects the resulting
//! billing data.
//!
//! # Usage
//!
//! ```bash
//! # Charge the account $10.00
//! API_TOKEN=... cargo run -p gpay-cli -- pay --amount 10.00
//!
//! # Store Google Pay as the default payment method
//! cargo run -p gpay-cli -- add-method
//!
//! # List payments (cached between calls within one process)
//! RUST_LOG=debug cargo run -p gpay-cli -- payments
//! ```
//!
//! # Environment Variables
//!
//! - `GPAY_CONFIG` - Path to TOML configuration file (default: `gpay.toml`)
//! - `API_BASE_URL` - Override the billing API base URL
//! - `API_TOKEN` - Billing API personal access token
//! - `RUST_LOG` - Log level filter (default: `info`)

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gpay::adapter::PaymentAdapter;
use gpay::billing::Warning;
use gpay::cache::QueryCache;
use gpay::feedback::{CheckoutFeedback, Severity};
use gpay::proto::TransactionInfo;
use gpay::sandbox::{SandboxGateway, SandboxPaymentsClient, SheetOutcome};
use gpay::settlement::PaymentAction;
use gpay::tokenize::SANDBOX_NONCE;
use gpay::{CheckoutBuilder, CheckoutOutcome};
use gpay_http::{BearerAuth, BillingClient};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "gpay")]
#[command(about = "Google Pay billing checkout tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "GPAY_CONFIG", default_value = "gpay.toml")]
    config: PathBuf,

    /// Billing API base URL (overrides the configuration file)
    #[arg(long, env = "API_BASE_URL")]
    api_base_url: Option<String>,

    /// Billing API token (overrides the configuration file)
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Request a client token for one checkout attempt
    ClientToken,

    /// Make a one-time payment with Google Pay
    Pay {
        /// Amount to charge, e.g. 10.00
        #[arg(long)]
        amount: String,

        /// ISO 4217 currency code
        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Store Google Pay as the default payment method
    AddMethod,

    /// List payments on the account
    Payments,

    /// List stored payment methods
    PaymentMethods,
}

/// Prints checkout feedback through the log.
#[derive(Debug, Clone, Copy)]
struct ConsoleFeedback;

impl CheckoutFeedback for ConsoleFeedback {
    fn set_message(&self, text: &str, severity: Severity, warnings: &[Warning]) {
        match severity {
            Severity::Success | Severity::Info => tracing::info!(%severity, "{text}"),
            Severity::Warning => tracing::warn!(%severity, "{text}"),
            Severity::Error => tracing::error!(%severity, "{text}"),
        }
        for warning in warnings {
            tracing::warn!(
                detail = warning.detail.as_deref().unwrap_or_default(),
                "{}",
                warning.title
            );
        }
    }

    fn set_processing(&self, processing: bool) {
        tracing::debug!(processing, "Processing indicator");
    }
}

/// Writes command output to stdout; logs go to stderr.
#[allow(clippy::print_stdout)]
fn emit(text: &str) {
    println!("{text}");
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("gpay failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_from(&cli.config)?;
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    if cli.api_token.is_some() {
        config.api_token = cli.api_token;
    }
    tracing::info!(
        api = %config.api_base_url,
        environment = %config.google_pay.environment,
        merchant = config.google_pay.has_merchant_id(),
        "Loaded configuration"
    );

    let cache = Arc::new(QueryCache::new(config.cache_ttl()));
    let mut billing = BillingClient::try_from(config.api_base_url.as_str())?
        .with_timeout(config.timeout())
        .with_cache(Arc::clone(&cache));
    match config.api_token.as_deref() {
        Some(token) => billing = billing.with_auth(BearerAuth::new(token)?),
        None => tracing::warn!("No API token configured; requests are unauthenticated"),
    }

    match cli.command {
        Command::ClientToken => {
            let token = billing.client_token().await?;
            emit(token.as_str());
        }
        Command::Payments => {
            let page = billing.payments().await?;
            emit(&serde_json::to_string_pretty(&page)?);
        }
        Command::PaymentMethods => {
            let page = billing.payment_methods().await?;
            emit(&serde_json::to_string_pretty(&page)?);
        }
        Command::Pay { amount, currency } => {
            let tx = TransactionInfo::final_price(amount, currency);
            checkout(&config, billing, cache, PaymentAction::OneTimePayment, &tx).await?;
        }
        Command::AddMethod => {
            let tx = TransactionInfo::not_currently_known("USD");
            checkout(&config, billing, cache, PaymentAction::AddRecurringPayment, &tx).await?;
        }
    }
    Ok(())
}

async fn checkout(
    config: &CliConfig,
    billing: BillingClient,
    cache: Arc<QueryCache>,
    action: PaymentAction,
    transaction_info: &TransactionInfo,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = billing.client_token().await?;
    let session = PaymentAdapter::new(SandboxGateway::new(), config.google_pay.clone())
        .initialize(&token)
        .await?;

    let payments = Arc::new(SandboxPaymentsClient::new(SheetOutcome::approve(
        SANDBOX_NONCE,
    )));
    let checkout = CheckoutBuilder::new(
        config.google_pay.clone(),
        payments,
        Arc::new(billing),
        cache,
    )
    .with_session(session)
    .build();

    let outcome = tokio::select! {
        outcome = checkout.run(action, transaction_info, &ConsoleFeedback) => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(%action, "Interrupted before the checkout finished");
            return Err("interrupted".into());
        }
    };

    match outcome {
        CheckoutOutcome::Completed(settlement) => {
            tracing::info!(action = %settlement.action(), "Checkout completed");
            Ok(())
        }
        CheckoutOutcome::Canceled => {
            tracing::info!(%action, "Checkout canceled");
            Ok(())
        }
        CheckoutOutcome::Failed(err) => Err(err.into()),
    }
}
