//! Billing API transport errors.

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// One entry of the API error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable reason.
    pub reason: String,
    /// Request field the reason applies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Error body returned by the billing API: `{ "errors": [{ "reason", "field"? }] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Reported errors.
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl ApiErrorBody {
    /// Parses an error body, falling back to the raw text as a single reason.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Self>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed,
            _ => Self {
                errors: vec![ApiError {
                    reason: body.trim().to_owned(),
                    field: None,
                }],
            },
        }
    }
}

fn join_reasons(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur while calling the billing API.
#[derive(Debug, thiserror::Error)]
pub enum BillingClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// A middleware refused or failed the request.
    #[error("Middleware error: {context}: {source}")]
    Middleware {
        /// Human-readable context.
        context: &'static str,
        /// The middleware error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {}", join_reasons(.errors))]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// Errors reported by the API.
        errors: Vec<ApiError>,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl BillingClientError {
    /// Maps a middleware-stack error, keeping transport failures distinct.
    pub(crate) fn from_middleware(context: &'static str, error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(source) => Self::Http { context, source },
            reqwest_middleware::Error::Middleware(source) => Self::Middleware {
                context,
                source: source.into(),
            },
        }
    }

    /// The HTTP status, if the API answered with an error status.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_error_envelope() {
        let body = ApiErrorBody::parse(
            r#"{"errors":[{"reason":"Card declined"},{"reason":"Must be positive","field":"usd"}]}"#,
        );
        assert_eq!(body.errors.len(), 2);
        assert_eq!(body.errors[1].to_string(), "usd: Must be positive");
    }

    #[test]
    fn unparseable_body_becomes_single_reason() {
        let body = ApiErrorBody::parse("Bad Gateway\n");
        assert_eq!(
            body.errors,
            vec![ApiError {
                reason: "Bad Gateway".into(),
                field: None
            }]
        );
    }

    #[test]
    fn status_error_lists_reasons() {
        let err = BillingClientError::HttpStatus {
            context: "POST /account/payments",
            status: StatusCode::BAD_REQUEST,
            errors: ApiErrorBody::parse(r#"{"errors":[{"reason":"Card declined"}]}"#).errors,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected HTTP status 400 Bad Request: POST /account/payments: Card declined"
        );
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }
}
