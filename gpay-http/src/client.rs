//! A [`gpay::settlement::BillingBackend`] implementation that talks to the
//! account billing API over HTTP.
//!
//! [`BillingClient`] handles the client token, payment and payment method
//! endpoints. List endpoints are served through a shared
//! [`QueryCache`] so that settlement invalidates exactly what it made stale.
//!
//! ## Error Handling
//!
//! [`BillingClientError`] captures the failure context:
//! - URL construction
//! - HTTP transport and middleware failures
//! - JSON deserialization errors
//! - Error statuses, with the API's `errors` envelope parsed

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gpay::adapter::ClientToken;
use gpay::billing::{
    AddPaymentMethodRequest, ClientTokenResponse, MakePaymentRequest, Page, Payment,
    PaymentMethod,
};
use gpay::cache::{CacheKey, QueryCache};
use gpay::error::BoxError;
use gpay::settlement::BillingBackend;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::auth::BearerAuth;
use crate::constants::{CLIENT_TOKEN_PATH, PAYMENT_METHODS_PATH, PAYMENTS_PATH};
use crate::error::{ApiErrorBody, BillingClientError};

/// A client for the account billing API.
#[derive(Clone, Debug)]
pub struct BillingClient {
    /// Base URL of the API (e.g. `https://api.linode.com/v4/`)
    base_url: Url,
    /// Full URL to `POST /account/client-token`
    client_token_url: Url,
    /// Full URL to `POST` and `GET /account/payments`
    payments_url: Url,
    /// Full URL to `POST` and `GET /account/payment-methods`
    payment_methods_url: Url,
    /// HTTP client with the middleware stack
    client: ClientWithMiddleware,
    /// Optional request timeout
    timeout: Option<Duration>,
    /// Cache for list endpoints
    cache: Arc<QueryCache>,
}

fn join(base_url: &Url, path: &str, context: &'static str) -> Result<Url, BillingClientError> {
    base_url
        .join(path)
        .map_err(|source| BillingClientError::UrlParse { context, source })
}

impl BillingClient {
    /// Constructs a client from a base URL, without authentication.
    ///
    /// # Errors
    ///
    /// Returns [`BillingClientError`] if URL construction fails.
    pub fn try_new(base_url: Url) -> Result<Self, BillingClientError> {
        let client_token_url = join(
            &base_url,
            CLIENT_TOKEN_PATH,
            "Failed to construct ./account/client-token URL",
        )?;
        let payments_url = join(
            &base_url,
            PAYMENTS_PATH,
            "Failed to construct ./account/payments URL",
        )?;
        let payment_methods_url = join(
            &base_url,
            PAYMENT_METHODS_PATH,
            "Failed to construct ./account/payment-methods URL",
        )?;
        Ok(Self {
            base_url,
            client_token_url,
            payments_url,
            payment_methods_url,
            client: ClientBuilder::new(Client::new()).build(),
            timeout: None,
            cache: Arc::new(QueryCache::default()),
        })
    }

    /// Authenticates every request with a bearer token.
    #[must_use]
    pub fn with_auth(mut self, auth: BearerAuth) -> Self {
        self.client = ClientBuilder::new(Client::new()).with(auth).build();
        self
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shares `cache` with other readers of the billing data.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the base URL used by this client.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured timeout, if any.
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the query cache.
    pub const fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Sends `POST /account/client-token`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "gpay.billing.client_token", skip_all, err)
    )]
    pub async fn client_token(&self) -> Result<ClientToken, BillingClientError> {
        let response: ClientTokenResponse = self
            .post_json(
                &self.client_token_url,
                "POST /account/client-token",
                &serde_json::json!({}),
            )
            .await?;
        Ok(response.client_token)
    }

    /// Sends `POST /account/payments`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "gpay.billing.make_payment", skip_all, fields(usd = %request.usd), err)
    )]
    pub async fn make_payment(
        &self,
        request: &MakePaymentRequest,
    ) -> Result<Payment, BillingClientError> {
        self.post_json(&self.payments_url, "POST /account/payments", request)
            .await
    }

    /// Sends `POST /account/payment-methods`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "gpay.billing.add_payment_method", skip_all, err)
    )]
    pub async fn add_payment_method(
        &self,
        request: &AddPaymentMethodRequest,
    ) -> Result<(), BillingClientError> {
        let _: serde_json::Value = self
            .post_json(
                &self.payment_methods_url,
                "POST /account/payment-methods",
                request,
            )
            .await?;
        Ok(())
    }

    /// Lists payments, served from the cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns [`BillingClientError`] if the HTTP request fails.
    pub async fn payments(&self) -> Result<Page<Payment>, BillingClientError> {
        self.cache
            .get_or_fetch(CacheKey::BillingPayments.segments(), || {
                self.get_json(&self.payments_url, "GET /account/payments")
            })
            .await
    }

    /// Lists stored payment methods, served from the cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns [`BillingClientError`] if the HTTP request fails.
    pub async fn payment_methods(&self) -> Result<Page<PaymentMethod>, BillingClientError> {
        self.cache
            .get_or_fetch(CacheKey::PaymentMethodsAll.segments(), || {
                self.get_json(&self.payment_methods_url, "GET /account/payment-methods")
            })
            .await
    }

    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, BillingClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.post(url.clone()).json(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| BillingClientError::from_middleware(context, e))?;
        let result = Self::read_json(http_response, context).await;
        record_result(&result);
        result
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "gpay.billing.get", skip(self), err)
    )]
    async fn get_json<R>(&self, url: &Url, context: &'static str) -> Result<R, BillingClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| BillingClientError::from_middleware(context, e))?;
        let result = Self::read_json(http_response, context).await;
        record_result(&result);
        result
    }

    async fn read_json<R>(
        http_response: reqwest::Response,
        context: &'static str,
    ) -> Result<R, BillingClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let status = http_response.status();
        if status.is_success() {
            return http_response
                .json::<R>()
                .await
                .map_err(|source| BillingClientError::JsonDeserialization { context, source });
        }
        let body = http_response
            .text()
            .await
            .map_err(|source| BillingClientError::ResponseBodyRead { context, source })?;
        Err(BillingClientError::HttpStatus {
            context,
            status,
            errors: ApiErrorBody::parse(&body).errors,
        })
    }
}

#[async_trait]
impl BillingBackend for BillingClient {
    async fn make_payment(&self, request: MakePaymentRequest) -> Result<Payment, BoxError> {
        Ok(Self::make_payment(self, &request).await?)
    }

    async fn add_payment_method(&self, request: AddPaymentMethodRequest) -> Result<(), BoxError> {
        Ok(Self::add_payment_method(self, &request).await?)
    }
}

/// Converts a string URL into a [`BillingClient`], normalizing the trailing slash.
impl TryFrom<&str> for BillingClient {
    type Error = BillingClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_owned();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|source| BillingClientError::UrlParse {
            context: "Failed to parse base url",
            source,
        })?;
        Self::try_new(url)
    }
}

#[cfg(feature = "telemetry")]
fn record_result<R, E: Display>(result: &Result<R, E>) {
    if let Err(err) = result {
        tracing::event!(tracing::Level::ERROR, error = %err, "Billing API request failed");
    }
}

#[cfg(not(feature = "telemetry"))]
fn record_result<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use gpay::cache::CacheInvalidator;
    use gpay::tokenize::Nonce;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payments_page() -> serde_json::Value {
        json!({
            "data": [{"id": 7, "date": "2026-10-01T12:00:00", "usd": "10.00"}],
            "page": 1,
            "pages": 1,
            "results": 1
        })
    }

    async fn client(server: &MockServer) -> BillingClient {
        BillingClient::try_from(server.uri().as_str())
            .unwrap()
            .with_auth(BearerAuth::new("token-123").unwrap())
    }

    #[tokio::test]
    async fn make_payment_posts_amount_and_nonce() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/account/payments"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_json(json!({"usd": "10.00", "nonce": "fake-android-pay-nonce"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "date": "2026-10-16T09:00:00",
                "usd": "10.00",
                "warnings": [{"title": "Payment pending review"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payment = client(&server)
            .await
            .make_payment(&MakePaymentRequest {
                usd: "10.00".into(),
                nonce: Nonce::sandbox(),
            })
            .await
            .unwrap();

        assert_eq!(payment.id, 42);
        assert_eq!(payment.warnings[0].title, "Payment pending review");
    }

    #[tokio::test]
    async fn add_payment_method_sends_default_nonce_method() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/account/payment-methods"))
            .and(body_json(json!({
                "type": "payment_method_nonce",
                "data": {"nonce": "tokencc_abc"},
                "is_default": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .add_payment_method(&AddPaymentMethodRequest::default_method(Nonce::new(
                "tokencc_abc",
            )))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_status_carries_api_reasons() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/account/payments"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errors": [{"reason": "Card declined", "field": "nonce"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .make_payment(&MakePaymentRequest {
                usd: "10.00".into(),
                nonce: Nonce::sandbox(),
            })
            .await
            .unwrap_err();

        match err {
            BillingClientError::HttpStatus { status, errors, .. } => {
                assert_eq!(status, http::StatusCode::BAD_REQUEST);
                assert_eq!(errors[0].reason, "Card declined");
                assert_eq!(errors[0].field.as_deref(), Some("nonce"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn client_token_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/account/client-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"client_token": "abc123"})),
            )
            .mount(&server)
            .await;

        let token = client(&server).await.client_token().await.unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[tokio::test]
    async fn payments_are_cached_until_invalidated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account/payments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payments_page()))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert_eq!(client.payments().await.unwrap().data[0].id, 7);
        // Served from the cache.
        assert_eq!(client.payments().await.unwrap().results, 1);

        client.cache().invalidate(CacheKey::BillingPayments);
        assert_eq!(client.payments().await.unwrap().data.len(), 1);
    }

    #[tokio::test]
    async fn invalidating_payments_keeps_payment_methods() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account/payment-methods"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": 1,
                    "type": "google_pay",
                    "is_default": true,
                    "data": {"last_four": "1111"}
                }],
                "page": 1,
                "pages": 1,
                "results": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        client.payment_methods().await.unwrap();
        client.cache().invalidate(CacheKey::BillingPayments);
        let methods = client.payment_methods().await.unwrap();
        assert_eq!(methods.data[0].kind, "google_pay");
    }

    #[tokio::test]
    async fn settlement_backend_maps_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/account/payment-methods"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let backend: Arc<dyn BillingBackend> = Arc::new(client(&server).await);
        let err = backend
            .add_payment_method(AddPaymentMethodRequest::default_method(Nonce::sandbox()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = BillingClient::try_from("https://api.example.com/v4").unwrap();
        assert_eq!(
            client.payments_url.as_str(),
            "https://api.example.com/v4/account/payments"
        );
        assert_eq!(
            client.client_token_url.as_str(),
            "https://api.example.com/v4/account/client-token"
        );
    }
}
