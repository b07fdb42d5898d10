//! # Payment Repository
//!
//! Payment rows and their status changes.
//!
//! ## Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_gateway_success(reference)                                       │
//! │                                                                         │
//! │  UPDATE ... SET paid, verified                                          │
//! │  WHERE reference = ? AND payment_status IN (settling statuses)          │
//! │       │                                                                 │
//! │       ├── 1 row  → transitioned = true   (caller notifies once)         │
//! │       │                                                                 │
//! │       └── 0 rows → UPDATE ... SET verified WHERE reference = ?          │
//! │                        ├── 1 row  → transitioned = false (paid/refunded)│
//! │                        └── 0 rows → NotFound                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The status guard lives in the UPDATE itself, so a webhook and a verify
//! call racing on the same reference settle it exactly once.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult, OrderError};
use eshop_core::{Payment, PaymentStatus};

const SELECT_PAYMENT: &str = r#"
    SELECT id, reference, amount_minor, payment_status, verified, currency,
           order_id, created_at, updated_at
    FROM payments
"#;

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a payment row.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the reference is already recorded
    /// * `DbError::ForeignKeyViolation` - the order does not exist
    pub async fn insert(&self, payment: &Payment) -> DbResult<()> {
        debug!(reference = %payment.reference, order_id = %payment.order_id, "Inserting payment");

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, reference, amount_minor, payment_status, verified, currency,
                order_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.reference)
        .bind(payment.amount_minor)
        .bind(payment.payment_status)
        .bind(payment.verified)
        .bind(&payment.currency)
        .bind(&payment.order_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a payment by its gateway reference.
    pub async fn get_by_reference(&self, reference: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!("{SELECT_PAYMENT} WHERE reference = ?1"))
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    /// Gets a payment by reference, only if its order belongs to `customer_id`.
    pub async fn get_for_customer(
        &self,
        reference: &str,
        customer_id: &str,
    ) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.id, p.reference, p.amount_minor, p.payment_status, p.verified,
                   p.currency, p.order_id, p.created_at, p.updated_at
            FROM payments p
            INNER JOIN orders o ON o.id = p.order_id
            WHERE p.reference = ?1 AND o.customer_id = ?2
            "#,
        )
        .bind(reference)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payment)
    }

    /// Payments of an order, newest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "{SELECT_PAYMENT} WHERE order_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Most recent payment of an order.
    pub async fn latest_for_order(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "{SELECT_PAYMENT} WHERE order_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payment)
    }

    /// Records a gateway-confirmed charge.
    ///
    /// Returns the payment after the update and whether this call moved it
    /// to `paid`. Repeating the call for a settled reference changes
    /// nothing and reports `false`.
    pub async fn apply_gateway_success(&self, reference: &str) -> DbResult<(Payment, bool)> {
        let now = Utc::now();

        let from: Vec<PaymentStatus> = PaymentStatus::settling().collect();
        let placeholders = (0..from.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE payments SET payment_status = ?2, verified = 1, updated_at = ?3 \
             WHERE reference = ?1 AND payment_status IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql)
            .bind(reference)
            .bind(PaymentStatus::Paid)
            .bind(now);
        for status in from {
            query = query.bind(status);
        }
        let settled = query.execute(&self.pool).await?;

        let transitioned = settled.rows_affected() == 1;

        if !transitioned {
            let touched = sqlx::query("UPDATE payments SET verified = 1 WHERE reference = ?1")
                .bind(reference)
                .execute(&self.pool)
                .await?;
            if touched.rows_affected() == 0 {
                return Err(DbError::not_found("Payment", reference));
            }
        }

        let payment = self
            .get_by_reference(reference)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", reference))?;

        if transitioned {
            info!(reference = %reference, order_id = %payment.order_id, "Payment settled");
        } else {
            debug!(reference = %reference, status = %payment.payment_status, "Payment already settled");
        }

        Ok((payment, transitioned))
    }

    /// `pending → cancelled`.
    pub async fn cancel(&self, reference: &str) -> Result<Payment, OrderError> {
        self.transition(reference, PaymentStatus::cancel).await
    }

    /// `paid → refunded`.
    pub async fn refund(&self, reference: &str) -> Result<Payment, OrderError> {
        self.transition(reference, PaymentStatus::refund).await
    }

    async fn transition(
        &self,
        reference: &str,
        step: fn(PaymentStatus) -> eshop_core::CoreResult<PaymentStatus>,
    ) -> Result<Payment, OrderError> {
        let payment = self
            .get_by_reference(reference)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", reference))?;

        let next = step(payment.payment_status).map_err(OrderError::Transition)?;

        let result = sqlx::query(
            r#"
            UPDATE payments SET payment_status = ?2, updated_at = ?3
            WHERE reference = ?1 AND payment_status = ?4
            "#,
        )
        .bind(reference)
        .bind(next)
        .bind(Utc::now())
        .bind(payment.payment_status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(
                DbError::not_found(format!("Payment ({})", payment.payment_status), reference)
                    .into(),
            );
        }

        info!(reference = %reference, from = %payment.payment_status, to = %next, "Payment status changed");

        self.get_by_reference(reference)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", reference).into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
