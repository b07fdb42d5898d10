//! # Payment Reconciliation
//!
//! Brings local payment state in line with the gateway.
//!
//! ## Entry Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PULL  verify_payment(reference, customer)                              │
//! │        payment of the customer's order? ── no ──► PaymentNotFound       │
//! │        gateway.verify(reference)                                        │
//! │        data.status == "success" ──► settle(reference)                   │
//! │        → gateway payload + order snapshot                               │
//! │                                                                         │
//! │  PUSH  handle_webhook(source, signature, body)                          │
//! │        WebhookVerifier (IP, then HMAC)                                  │
//! │        WebhookEvent::parse                                              │
//! │        ChargeSuccess{reference} ──► settle(reference)                   │
//! │        Unhandled(event)         ──► acknowledge                         │
//! │                                                                         │
//! │  settle = PaymentRepository::apply_gateway_success                      │
//! │           + PaymentNotifier, only when the row actually moved to paid   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both paths converge: whichever arrives first settles the payment and
//! notifies, the other only re-asserts `verified`.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ReconcileError, WebhookRejection};
use crate::gateway::PaymentGateway;
use crate::notify::PaymentNotifier;
use crate::webhook::WebhookVerifier;
use eshop_core::gateway::WebhookEvent;
use eshop_core::{OrderSnapshot, Payment};
use eshop_db::Database;

/// Answer of the pull path: the gateway's view plus the order.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedPayment {
    pub reference: String,
    /// Gateway status string (`success`, `abandoned`, ...).
    pub status: String,
    /// Minor units, as reported by the gateway.
    pub amount: i64,
    pub currency: String,
    pub paid_at: Option<String>,
    pub channel: Option<String>,
    pub gateway_response: Option<String>,
    pub order: OrderSnapshot,
}

/// What an accepted webhook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// `charge.success` applied. `transitioned` is false for replays.
    Settled { reference: String, transitioned: bool },
    /// Event acknowledged without a state change.
    Ignored { event: String },
}

/// Applies gateway truth to payments, from either direction.
#[derive(Clone)]
pub struct ReconciliationEngine {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    verifier: WebhookVerifier,
    notifier: Arc<dyn PaymentNotifier>,
}

impl ReconciliationEngine {
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
        notifier: Arc<dyn PaymentNotifier>,
    ) -> Self {
        ReconciliationEngine {
            db,
            gateway,
            verifier,
            notifier,
        }
    }

    // =========================================================================
    // Pull Path
    // =========================================================================

    /// Asks the gateway about one of the customer's payments and records a
    /// success.
    ///
    /// References that belong to another customer are reported exactly like
    /// unknown ones, and the gateway is not called for them.
    pub async fn verify_payment(
        &self,
        reference: &str,
        customer_id: &str,
    ) -> Result<VerifiedPayment, ReconcileError> {
        let payment = self
            .db
            .payments()
            .get_for_customer(reference, customer_id)
            .await?
            .ok_or_else(|| {
                warn!(reference = %reference, customer_id = %customer_id, "Verify for unknown payment");
                ReconcileError::PaymentNotFound
            })?;

        let data = self.gateway.verify(reference).await?;

        if data.is_success() {
            self.settle(reference).await?;
        } else {
            debug!(reference = %reference, status = %data.status, "Gateway reports no settlement yet");
        }

        let order = self
            .db
            .orders()
            .snapshot_by_id(&payment.order_id)
            .await?
            .ok_or(ReconcileError::OrderNotFound)?;

        Ok(VerifiedPayment {
            reference: data.reference,
            status: data.status,
            amount: data.amount,
            currency: data.currency,
            paid_at: data.paid_at,
            channel: data.channel,
            gateway_response: data.gateway_response,
            order,
        })
    }

    /// Customer-side abandonment of a pending payment.
    pub async fn cancel_payment(
        &self,
        reference: &str,
        customer_id: &str,
    ) -> Result<Payment, ReconcileError> {
        self.db
            .payments()
            .get_for_customer(reference, customer_id)
            .await?
            .ok_or(ReconcileError::PaymentNotFound)?;

        Ok(self.db.payments().cancel(reference).await?)
    }

    // =========================================================================
    // Push Path
    // =========================================================================

    /// Handles one gateway callback.
    ///
    /// Authenticity is checked on the raw bytes before parsing. Failures
    /// while applying the event are logged and reported as
    /// [`WebhookRejection::HandlingFailed`], never propagated.
    pub async fn handle_webhook(
        &self,
        source: IpAddr,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookRejection> {
        self.verifier.verify(source, signature, body)?;

        let event = WebhookEvent::parse(body).map_err(|e| {
            warn!(source = %source, error = %e, "Webhook body is not a valid event");
            WebhookRejection::BadPayload
        })?;

        match event {
            WebhookEvent::ChargeSuccess { reference: None } => {
                warn!(source = %source, "charge.success without reference");
                Err(WebhookRejection::MissingReference)
            }
            WebhookEvent::ChargeSuccess {
                reference: Some(reference),
            } => match self.settle(&reference).await {
                Ok((_, transitioned)) => Ok(WebhookOutcome::Settled {
                    reference,
                    transitioned,
                }),
                Err(err) if err.is_not_found() => {
                    warn!(reference = %reference, "Webhook for a payment unknown locally");
                    Err(WebhookRejection::UnknownReference(reference))
                }
                Err(err) => {
                    error!(reference = %reference, error = %err, "Failed to apply charge.success");
                    Err(WebhookRejection::HandlingFailed)
                }
            },
            WebhookEvent::Unhandled(event) => {
                debug!(event = %event, "Unhandled webhook event acknowledged");
                Ok(WebhookOutcome::Ignored { event })
            }
        }
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    async fn settle(&self, reference: &str) -> Result<(Payment, bool), ReconcileError> {
        let (payment, transitioned) = self.db.payments().apply_gateway_success(reference).await?;

        if transitioned {
            match self.db.orders().snapshot_by_id(&payment.order_id).await? {
                Some(order) => self.notifier.payment_settled(&payment, &order).await,
                None => warn!(order_id = %payment.order_id, "Settled payment without an order"),
            }
        } else {
            info!(reference = %reference, status = %payment.payment_status, "Settlement replayed");
        }

        Ok((payment, transitioned))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
