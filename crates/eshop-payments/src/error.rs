//! # Payment Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Payment Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  GatewayError   │  │ ReconcileError  │  │   WebhookRejection      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Unavailable ⟳  │  │  PaymentNotFound│  │  Forbidden        403   │ │
//! │  │  Rejected       │  │  OrderNotFound  │  │  BadSignature     400   │ │
//! │  │  Decode         │  │  NotPayable     │  │  BadPayload       400   │ │
//! │  │                 │  │  Gateway / Order│  │  MissingReference 400   │ │
//! │  │                 │  │  Db             │  │  UnknownReference 404   │ │
//! │  │                 │  │                 │  │  HandlingFailed   400   │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ⟳ = retryable by the caller                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use eshop_db::{DbError, OrderError};
use thiserror::Error;

// =============================================================================
// Gateway
// =============================================================================

/// Failure talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure, timeout or non-2xx HTTP status.
    ///
    /// ## When This Occurs
    /// - Gateway unreachable or slower than the configured timeout
    /// - Gateway answers 4xx/5xx
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway answered 2xx with `status: false`.
    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),

    /// The response body did not match the expected shape.
    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Returns true if the same call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Outcome of checkout and pull-path reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No payment with this reference on the caller's orders. Also returned
    /// when the reference exists for another customer.
    #[error("Unable to verify payment. Please verify reference")]
    PaymentNotFound,

    /// No such order for the caller.
    #[error("Order not found")]
    OrderNotFound,

    /// The order cannot take a new payment attempt.
    #[error("Order cannot be paid: {reason}")]
    NotPayable { reason: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl ReconcileError {
    /// Whether this is a missing-row error from the database layer.
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::Db(err) => err.is_not_found(),
            ReconcileError::Order(OrderError::Db(err)) => err.is_not_found(),
            _ => false,
        }
    }
}

// =============================================================================
// Webhook
// =============================================================================

/// Why a webhook call was refused.
///
/// Every variant is answered with an error envelope; none of them mutate
/// state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookRejection {
    /// Source address is not on the allow-list.
    #[error("Forbidden: Invalid IP.")]
    Forbidden,

    /// Signature header missing, not hex, or not matching the body.
    #[error("Invalid signature")]
    BadSignature,

    /// Body is not a JSON event.
    #[error("Invalid Payload")]
    BadPayload,

    /// `charge.success` without `data.reference`.
    #[error("Missing transaction reference.")]
    MissingReference,

    /// The reference is unknown locally.
    #[error("Transaction not found")]
    UnknownReference(String),

    /// Anything else that went wrong while applying the event.
    #[error("Error handling charge.success event.")]
    HandlingFailed,
}

impl WebhookRejection {
    /// HTTP status to answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookRejection::Forbidden => 403,
            WebhookRejection::UnknownReference(_) => 404,
            WebhookRejection::BadSignature
            | WebhookRejection::BadPayload
            | WebhookRejection::MissingReference
            | WebhookRejection::HandlingFailed => 400,
        }
    }

    /// Machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookRejection::Forbidden => "FORBIDDEN_IP",
            WebhookRejection::BadSignature => "INVALID_SIGNATURE",
            WebhookRejection::BadPayload => "INVALID_PAYLOAD",
            WebhookRejection::MissingReference => "MISSING_REFERENCE",
            WebhookRejection::UnknownReference(_) => "TRANSACTION_NOT_FOUND",
            WebhookRejection::HandlingFailed => "WEBHOOK_HANDLING_FAILED",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
