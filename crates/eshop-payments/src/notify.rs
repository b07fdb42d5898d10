//! # Settlement Notifications
//!
//! Hook invoked once per payment that moves to `paid`, from either the
//! verify path or the webhook path. Replays and repeated verifies do not
//! call it again.

use async_trait::async_trait;
use tracing::info;

use eshop_core::{OrderSnapshot, Payment};

/// Receives settled payments (order confirmation e-mails and the like).
///
/// Implementations handle their own failures; the payment is already
/// settled when this runs.
#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    async fn payment_settled(&self, payment: &Payment, order: &OrderSnapshot);
}

/// Writes a log line per settlement.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl PaymentNotifier for LogNotifier {
    async fn payment_settled(&self, payment: &Payment, order: &OrderSnapshot) {
        info!(
            reference = %payment.reference,
            order_id = %order.order.id,
            order_number = %order.order.order_number,
            customer_id = %order.order.customer_id,
            amount = %payment.amount(),
            currency = %payment.currency,
            "Payment settled"
        );
    }
}
