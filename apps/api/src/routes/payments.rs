//! Payment endpoints.
//!
//! The webhook takes the raw body: the signature covers the exact bytes
//! the gateway sent, so nothing may re-serialize them before the check.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use eshop_core::{OrderPaymentStatus, Payment, PaymentStatus};
use eshop_payments::{ReconcileError, VerifiedPayment, WebhookOutcome, SIGNATURE_HEADER};

use crate::auth::Customer;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments/verify/{reference}", get(verify_payment))
        .route("/api/payments/{reference}/cancel", post(cancel_payment))
        .route("/api/payments/webhook", post(webhook))
}

/// `GET /api/payments/verify/{reference}`
async fn verify_payment(
    State(state): State<AppState>,
    customer: Customer,
    Path(reference): Path<String>,
) -> Result<ApiResponse<VerifiedPayment>, ApiError> {
    let verified = state
        .engine
        .verify_payment(&reference, &customer.id)
        .await
        .map_err(|err| match err {
            ReconcileError::Gateway(e) => {
                error!(reference = %reference, error = %e, "Verify call to gateway failed");
                ApiError::verify_unavailable()
            }
            other => other.into(),
        })?;

    let message = if verified.order.payment_status == OrderPaymentStatus::Paid {
        "Payment verified successfully."
    } else {
        "Payment not completed yet."
    };
    Ok(ApiResponse::ok(verified, message))
}

#[derive(Debug, Serialize)]
struct PaymentView {
    reference: String,
    payment_status: PaymentStatus,
    verified: bool,
    amount: String,
    currency: String,
    order_id: String,
}

impl From<Payment> for PaymentView {
    fn from(p: Payment) -> Self {
        PaymentView {
            amount: p.amount().to_major_string(),
            reference: p.reference,
            payment_status: p.payment_status,
            verified: p.verified,
            currency: p.currency,
            order_id: p.order_id,
        }
    }
}

/// `POST /api/payments/{reference}/cancel`
async fn cancel_payment(
    State(state): State<AppState>,
    customer: Customer,
    Path(reference): Path<String>,
) -> Result<ApiResponse<PaymentView>, ApiError> {
    let payment = state.engine.cancel_payment(&reference, &customer.id).await?;
    Ok(ApiResponse::ok(payment.into(), "Payment cancelled."))
}

/// `POST /api/payments/webhook`
async fn webhook(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<Map<String, Value>>, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let outcome = state.engine.handle_webhook(peer.ip(), signature, &body).await?;
    match outcome {
        WebhookOutcome::Settled {
            reference,
            transitioned,
        } => info!(reference = %reference, transitioned, "Webhook processed"),
        WebhookOutcome::Ignored { event } => info!(event = %event, "Webhook ignored"),
    }

    Ok(ApiResponse::ok(Map::new(), "Verified successfully"))
}
