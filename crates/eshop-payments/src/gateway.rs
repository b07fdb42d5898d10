//! # Payment Gateway Adapter
//!
//! The [`PaymentGateway`] seam and its Paystack implementation.
//!
//! ## Calls
//! ```text
//! initialize ── POST {base}/transaction/initialize      Bearer <secret>
//!               body: InitializeRequest (amount in minor units)
//!               → Envelope<InitializeData>
//!
//! verify     ── GET  {base}/transaction/verify/{reference}
//!               → Envelope<TransactionData>
//! ```
//!
//! Both calls are bounded by the configured timeout. A transport failure,
//! timeout or non-2xx status becomes [`GatewayError::Unavailable`]; neither
//! call is retried here.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use eshop_core::gateway::{Envelope, InitializeData, InitializeRequest, TransactionData};

/// Outbound payment provider operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a transaction and returns the checkout reference and URL.
    async fn initialize(&self, request: &InitializeRequest) -> Result<InitializeData, GatewayError>;

    /// Reads the gateway's view of a transaction. No local side effects.
    async fn verify(&self, reference: &str) -> Result<TransactionData, GatewayError>;
}

// =============================================================================
// Paystack
// =============================================================================

/// reqwest-backed Paystack client.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl PaystackClient {
    /// Builds the client with the configured timeout.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(PaystackClient { http, config })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| GatewayError::Unavailable(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Unavailable("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, operation: &'static str, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            error!(operation, timeout_secs = self.config.timeout.as_secs_f64(), "Gateway call timed out");
            GatewayError::Unavailable(format!("{operation} timed out"))
        } else {
            error!(operation, error = %err, "Gateway call failed");
            GatewayError::Unavailable(format!("{operation} failed: {err}"))
        }
    }

    /// Unwraps `{ status, message, data }` from a gateway response.
    async fn read<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(operation, status = status.as_u16(), body = %body, "Gateway returned an HTTP error");
            return Err(GatewayError::Unavailable(format!(
                "{operation} returned HTTP {}",
                status.as_u16()
            )));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                return self.transport_error(operation, e);
            }
            error!(operation, error = %e, "Gateway response did not decode");
            GatewayError::Decode(e.to_string())
        })?;

        if !envelope.status {
            error!(operation, message = %envelope.message, "Gateway refused the request");
            return Err(GatewayError::Rejected(envelope.message));
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::Decode(format!("{operation} response has no data")))
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(&self, request: &InitializeRequest) -> Result<InitializeData, GatewayError> {
        let mut body = request.clone();
        if body.callback_url.is_none() {
            body.callback_url = self.config.callback_url.clone();
        }

        debug!(
            order_id = %body.metadata.order_id,
            amount = body.amount,
            currency = %body.currency,
            "Initializing gateway transaction"
        );

        let response = self
            .http
            .post(self.endpoint(&["transaction", "initialize"])?)
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error("initialize", e))?;

        self.read("initialize", response).await
    }

    async fn verify(&self, reference: &str) -> Result<TransactionData, GatewayError> {
        debug!(reference = %reference, "Verifying gateway transaction");

        let response = self
            .http
            .get(self.endpoint(&["transaction", "verify", reference])?)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| self.transport_error("verify", e))?;

        self.read("verify", response).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use eshop_core::gateway::PaymentMetadata;
    use serde_json::{json, Value};
    use std::time::Duration;

    const SECRET: &str = "sk_test_gateway";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {SECRET}"))
            .unwrap_or(false)
    }

    async fn initialize(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": false, "message": "Invalid key"})),
            );
        }
        let reference = format!("ref_{}_{}", body["amount"], body["currency"].as_str().unwrap_or(""));
        (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": body["callback_url"].as_str().unwrap_or("https://checkout.test/x"),
                    "access_code": "acc_1",
                    "reference": reference,
                }
            })),
        )
    }

    async fn verify(Path(reference): Path<String>) -> Json<Value> {
        Json(json!({
            "status": true,
            "message": "Verification successful",
            "data": {
                "status": "success",
                "reference": reference,
                "amount": 450000,
                "currency": "NGN",
                "paid_at": "2026-10-19T10:00:00.000Z",
                "channel": "card",
                "gateway_response": "Approved"
            }
        }))
    }

    /// Serves `app` on an ephemeral local port and returns its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn mock_gateway() -> String {
        serve(
            Router::new()
                .route("/transaction/initialize", post(initialize))
                .route("/transaction/verify/{reference}", get(verify)),
        )
        .await
    }

    fn client(base_url: &str) -> PaystackClient {
        PaystackClient::new(
            GatewayConfig::new(SECRET)
                .base_url(base_url)
                .timeout(Duration::from_millis(500)),
        )
        .unwrap()
    }

    fn request(amount: i64) -> InitializeRequest {
        InitializeRequest {
            email: "ada@example.com".to_string(),
            amount,
            currency: "NGN".to_string(),
            metadata: PaymentMetadata {
                order_id: "o-1".to_string(),
                order_number: "BZRILBT-3FA91C".to_string(),
            },
            callback_url: None,
        }
    }

    #[tokio::test]
    async fn test_initialize_sends_minor_units_with_bearer() {
        let base = mock_gateway().await;
        let data = client(&base).initialize(&request(450_000)).await.unwrap();
        assert_eq!(data.reference, "ref_450000_NGN");
        assert_eq!(data.access_code, "acc_1");
    }

    #[tokio::test]
    async fn test_initialize_uses_configured_callback() {
        let base = mock_gateway().await;
        let gateway = PaystackClient::new(
            GatewayConfig::new(SECRET)
                .base_url(&base)
                .callback_url(Some("https://shop.test/paid".to_string())),
        )
        .unwrap();

        let data = gateway.initialize(&request(100)).await.unwrap();
        assert_eq!(data.authorization_url, "https://shop.test/paid");
    }

    #[tokio::test]
    async fn test_verify_reads_transaction() {
        let base = mock_gateway().await;
        let data = client(&base).verify("ref_abc").await.unwrap();
        assert!(data.is_success());
        assert_eq!(data.reference, "ref_abc");
        assert_eq!(data.amount, 450_000);
        assert_eq!(data.channel.as_deref(), Some("card"));
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let base = mock_gateway().await;
        let gateway = PaystackClient::new(GatewayConfig::new("sk_wrong").base_url(&base)).unwrap();

        let err = gateway.initialize(&request(100)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_status_false_is_rejected() {
        let base = serve(Router::new().route(
            "/transaction/verify/{reference}",
            get(|| async { Json(json!({"status": false, "message": "Transaction reference not found"})) }),
        ))
        .await;

        let err = client(&base).verify("nope").await.unwrap_err();
        match err {
            GatewayError::Rejected(message) => assert_eq!(message, "Transaction reference not found"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let base = serve(Router::new().route(
            "/transaction/verify/{reference}",
            get(|| async { "<html>maintenance</html>" }),
        ))
        .await;

        let err = client(&base).verify("ref").await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_gateway_times_out() {
        let base = serve(Router::new().route(
            "/transaction/verify/{reference}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"status": true, "data": null}))
            }),
        ))
        .await;

        let gateway = PaystackClient::new(
            GatewayConfig::new(SECRET)
                .base_url(&base)
                .timeout(Duration::from_millis(100)),
        )
        .unwrap();

        let err = gateway.verify("ref").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}")).verify("ref").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_reference_is_path_encoded() {
        let gateway = client("http://127.0.0.1:1");
        let url = gateway.endpoint(&["transaction", "verify", "a/b c"]).unwrap();
        assert_eq!(url.path(), "/transaction/verify/a%2Fb%20c");

        let gateway = client("http://127.0.0.1:1/");
        let url = gateway.endpoint(&["transaction", "initialize"]).unwrap();
        assert_eq!(url.path(), "/transaction/initialize");
    }
}
