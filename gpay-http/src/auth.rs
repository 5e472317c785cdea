//! Bearer token authentication for billing API requests.

use std::fmt;

use http::{Extensions, HeaderValue, header::AUTHORIZATION};
use reqwest::{Request, Response};
use reqwest_middleware as rqm;

#[cfg(feature = "telemetry")]
use tracing::trace;

/// Adds `Authorization: Bearer <token>` to every request that lacks one.
#[derive(Clone)]
pub struct BearerAuth {
    header: HeaderValue,
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").field("header", &"<redacted>").finish()
    }
}

impl BearerAuth {
    /// Creates the middleware for a personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`http::header::InvalidHeaderValue`] if the token contains
    /// characters that are not valid in a header.
    pub fn new(token: &str) -> Result<Self, http::header::InvalidHeaderValue> {
        let mut header = HeaderValue::from_str(&format!("Bearer {}", token.trim()))?;
        header.set_sensitive(true);
        Ok(Self { header })
    }
}

#[async_trait::async_trait]
impl rqm::Middleware for BearerAuth {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        if !req.headers().contains_key(AUTHORIZATION) {
            req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        }
        #[cfg(feature = "telemetry")]
        trace!(url = %req.url(), "Sending authenticated billing request");
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_sensitive_and_redacted() {
        let auth = BearerAuth::new("secret-token\n").unwrap();
        assert!(auth.header.is_sensitive());
        assert_eq!(auth.header.to_str().unwrap(), "Bearer secret-token");
        assert!(!format!("{auth:?}").contains("secret"));
    }

    #[test]
    fn rejects_tokens_with_control_characters() {
        assert!(BearerAuth::new("abc\u{7}def").is_err());
    }
}
