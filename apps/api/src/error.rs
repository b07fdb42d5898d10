//! Error types for the HTTP API.
//!
//! Every failure leaves the server as
//! `{ "status": <http code>, "code": "...", "message": "...", "errors"?: {...} }`.
//! Internal faults are logged here and answered with a generic message.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use eshop_core::ValidationError;
use eshop_db::{DbError, OrderError};
use eshop_payments::{ReconcileError, WebhookRejection};

const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";
const UNAVAILABLE_MESSAGE: &str =
    "Unable to reach the payment service at this time. Please try again later or contact support if issue persists.";

/// API error answered to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Field-level detail for validation failures.
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Logs `cause` and hides it from the client.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        ApiError::fatal("INTERNAL_ERROR", cause)
    }

    /// 500 under its own code; the client still only sees the generic message.
    fn fatal(code: &'static str, cause: impl std::fmt::Display) -> Self {
        error!(code, error = %cause, "Internal error");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, code, INTERNAL_MESSAGE)
    }

    fn unavailable(message: &str) -> Self {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// 503 with the verify-specific wording.
    pub fn verify_unavailable() -> Self {
        ApiError::unavailable(
            "Unable to verify payment at this time. Please try again later or contact support if issue persists.",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            code: self.code,
            message: &self.message,
            errors: self.errors.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(err.field().to_string(), vec![err.to_string()]);
        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: err.to_string(),
            errors: Some(errors),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::internal(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(e) => e.into(),
            OrderError::StockConflict { .. } => ApiError::new(
                StatusCode::CONFLICT,
                "STOCK_CONFLICT",
                "Stock changed while placing the order. Please try again",
            ),
            OrderError::Transition(e) => ApiError::new(StatusCode::CONFLICT, "INVALID_TRANSITION", e.to_string()),
            OrderError::Db(e) if e.is_not_found() => ApiError::not_found(e.to_string()),
            err @ OrderError::UniqueIdExhausted { .. } => ApiError::fatal("ORDER_NUMBER_EXHAUSTED", err),
            err @ (OrderError::OrderNumber(_) | OrderError::Db(_)) => ApiError::internal(err),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::PaymentNotFound => ApiError::new(
                StatusCode::BAD_REQUEST,
                "PAYMENT_NOT_FOUND",
                ReconcileError::PaymentNotFound.to_string(),
            ),
            ReconcileError::OrderNotFound => ApiError::not_found("Order not found"),
            ReconcileError::NotPayable { .. } => {
                ApiError::new(StatusCode::CONFLICT, "ORDER_NOT_PAYABLE", err.to_string())
            }
            ReconcileError::Gateway(e) => {
                error!(error = %e, "Payment gateway call failed");
                ApiError::unavailable(UNAVAILABLE_MESSAGE)
            }
            ReconcileError::Order(e) => e.into(),
            ReconcileError::Db(e) => e.into(),
        }
    }
}

impl From<WebhookRejection> for ApiError {
    fn from(rejection: WebhookRejection) -> Self {
        ApiError::new(
            StatusCode::from_u16(rejection.status_code()).unwrap_or(StatusCode::BAD_REQUEST),
            rejection.code(),
            rejection.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_has_field_detail() {
        let err: ApiError = ValidationError::BelowMinimumQuantity {
            field: "items[0].quantity".to_string(),
            moq: 2,
        }
        .into();

        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(
            json["errors"]["items[0].quantity"][0],
            "Min order quantity (MOQ) for this product is 2"
        );
    }

    #[tokio::test]
    async fn test_internal_errors_are_generic() {
        let err: ApiError = DbError::QueryFailed("no such table: secret_stuff".to_string()).into();
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], INTERNAL_MESSAGE);
        assert!(json.get("errors").is_none());
        assert!(!json.to_string().contains("secret_stuff"));
    }

    #[tokio::test]
    async fn test_exhausted_order_numbers_have_own_code() {
        let err: ApiError = OrderError::UniqueIdExhausted { attempts: 5 }.into();
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "ORDER_NUMBER_EXHAUSTED");
        assert_eq!(json["message"], INTERNAL_MESSAGE);

        let err: ApiError = OrderError::Db(DbError::QueryFailed("disk I/O error".to_string())).into();
        let (_, json) = body(err).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_gateway_errors_are_unavailable() {
        let err: ApiError =
            ReconcileError::Gateway(eshop_payments::GatewayError::Rejected("Invalid key".to_string())).into();
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
        assert!(!json.to_string().contains("Invalid key"));
    }

    #[tokio::test]
    async fn test_webhook_rejection_codes() {
        let (status, json) = body(WebhookRejection::Forbidden.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "FORBIDDEN_IP");
        assert_eq!(json["message"], "Forbidden: Invalid IP.");

        let (status, json) = body(WebhookRejection::UnknownReference("r".to_string()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "TRANSACTION_NOT_FOUND");
    }
}
