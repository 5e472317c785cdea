//! User feedback and exception reporting collaborators.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::billing::Warning;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Error,
    /// The operation succeeded with caveats.
    Warning,
    /// Informational.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// Caller-supplied sink for user feedback during a checkout attempt.
pub trait CheckoutFeedback: Send + Sync {
    /// Shows a message, with any warnings returned by the backend.
    fn set_message(&self, text: &str, severity: Severity, warnings: &[Warning]);

    /// Toggles the processing indicator.
    fn set_processing(&self, processing: bool);
}

/// External exception tracker.
pub trait ExceptionReporter: Send + Sync {
    /// Records `error` with a descriptive context message.
    fn report(&self, error: &(dyn Error + 'static), context: &str);
}

/// Reporter that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ExceptionReporter for TracingReporter {
    fn report(&self, error: &(dyn Error + 'static), context: &str) {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        tracing::error!(error = %error, causes = ?chain, "{context}");
    }
}
