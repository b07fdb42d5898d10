//! # Checkout
//!
//! Order placement followed by payment initialization.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order                                                            │
//! │                                                                         │
//! │  OrderRepository::create ──► committed order (stock reserved)          │
//! │       │                                                                 │
//! │       ├── total <= 0 ──► NoPaymentRequired                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PaymentGateway::initialize(email, total in minor units, metadata)     │
//! │       │                                                                 │
//! │       ├── error ──► OrderRepository::release (stock restored)          │
//! │       │             caller gets the gateway error                       │
//! │       ▼                                                                 │
//! │  INSERT payments (pending, unverified) ──► AwaitingPayment             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::gateway::PaymentGateway;
use eshop_core::gateway::{InitializeData, InitializeRequest, PaymentMetadata};
use eshop_core::{NewOrder, OrderNumberGenerator, OrderSnapshot, OrderStatus, Payment, PaymentStatus};
use eshop_db::Database;

/// Result of a successful placement.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Placement {
    /// The order total is zero; nothing to charge.
    NoPaymentRequired { order: OrderSnapshot },
    /// A gateway transaction is open; the customer pays at `payment.authorization_url`.
    AwaitingPayment {
        order: OrderSnapshot,
        payment: InitializeData,
    },
}

impl Placement {
    pub fn order(&self) -> &OrderSnapshot {
        match self {
            Placement::NoPaymentRequired { order } | Placement::AwaitingPayment { order, .. } => order,
        }
    }
}

/// Places orders and opens gateway transactions for them.
#[derive(Clone)]
pub struct Checkout {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl Checkout {
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>) -> Self {
        Checkout {
            db,
            gateway,
            currency: currency.into(),
        }
    }

    /// Places an order for `customer_id` and starts its payment.
    ///
    /// A failed payment start releases the order again, so the caller can
    /// simply retry the whole placement.
    pub async fn place_order(
        &self,
        customer_id: &str,
        email: &str,
        request: &NewOrder,
        numbers: &dyn OrderNumberGenerator,
    ) -> Result<Placement, ReconcileError> {
        let order = self.db.orders().create(customer_id, request, numbers).await?;

        if !order.totals.requires_payment() {
            info!(order_id = %order.order.id, "No payment required");
            return Ok(Placement::NoPaymentRequired { order });
        }

        match self.start_payment(&order, email).await {
            Ok(payment) => {
                let order = self
                    .db
                    .orders()
                    .snapshot_by_id(&order.order.id)
                    .await?
                    .unwrap_or(order);
                Ok(Placement::AwaitingPayment { order, payment })
            }
            Err(err) => {
                warn!(order_id = %order.order.id, error = %err, "Payment not started, releasing order");
                if let Err(release_err) = self.db.orders().release(&order.order.id).await {
                    error!(
                        order_id = %order.order.id,
                        error = %release_err,
                        "Failed to release order after payment failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Opens a fresh payment attempt for one of the customer's own orders.
    ///
    /// ## Errors
    /// * `OrderNotFound` - no such order for this customer
    /// * `NotPayable` - the order is not `processing`, is already paid or
    ///   refunded, or costs nothing
    pub async fn retry_payment(
        &self,
        customer_id: &str,
        email: &str,
        order_id: &str,
    ) -> Result<InitializeData, ReconcileError> {
        let order = self
            .db
            .orders()
            .get_for_customer(customer_id, order_id)
            .await?
            .ok_or(ReconcileError::OrderNotFound)?;

        if order.order.status != OrderStatus::Processing {
            return Err(ReconcileError::NotPayable {
                reason: format!("order is {}", order.order.status),
            });
        }
        if !order.payment_status.accepts_new_payment() {
            return Err(ReconcileError::NotPayable {
                reason: "order has already been paid".to_string(),
            });
        }
        if !order.totals.requires_payment() {
            return Err(ReconcileError::NotPayable {
                reason: "no payment required".to_string(),
            });
        }

        self.start_payment(&order, email).await
    }

    async fn start_payment(
        &self,
        order: &OrderSnapshot,
        email: &str,
    ) -> Result<InitializeData, ReconcileError> {
        let request = InitializeRequest {
            email: email.to_string(),
            amount: order.totals.total_amount.minor(),
            currency: self.currency.clone(),
            metadata: PaymentMetadata {
                order_id: order.order.id.clone(),
                order_number: order.order.order_number.clone(),
            },
            callback_url: None,
        };

        let data = self.gateway.initialize(&request).await?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            reference: data.reference.clone(),
            amount_minor: request.amount,
            payment_status: PaymentStatus::Pending,
            verified: false,
            currency: request.currency,
            order_id: order.order.id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.db.payments().insert(&payment).await?;

        info!(
            order_id = %order.order.id,
            reference = %payment.reference,
            amount = %payment.amount(),
            "Payment started"
        );

        Ok(data)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
