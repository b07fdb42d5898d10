//! # Order Repository
//!
//! Transactional order placement and the order read model.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(customer, request, generator)                                   │
//! │                                                                         │
//! │  pure checks        items present, no product listed twice             │
//! │  discount lookups   codes exist and are active (read-only)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────┐      │
//! │  │ attempt 1..=5:                                               │      │
//! │  │   SAVEPOINT → INSERT orders(order_number = candidate)        │      │
//! │  │   UNIQUE(order_number) hit? ROLLBACK TO SAVEPOINT, next      │      │
//! │  │ all 5 collided? → UniqueIdExhausted                          │      │
//! │  │                                                              │      │
//! │  │ for each item:                                               │      │
//! │  │   read product → inventory ledger check                      │      │
//! │  │   UPDATE products ... WHERE stock_quantity >= qty            │      │
//! │  │   INSERT order_items                                         │      │
//! │  │                                                              │      │
//! │  │ UPDATE orders SET total_quantity                             │      │
//! │  COMMIT ────────────────────────────────────────────────────────┘      │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing persists.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The order INSERT is the first statement of the transaction, so the
//! connection takes SQLite's write lock before it reads any product row.
//! Concurrent placements therefore queue on `busy_timeout` and each one
//! sees the stock left by the previous commit.

use chrono::Utc;
use sqlx::{Connection, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult, OrderError};
use crate::repository::discount::DiscountRepository;
use eshop_core::validation::{check_line, item_field, validate_items_present, validate_unique_products};
use eshop_core::{
    NewOrder, Order, OrderLine, OrderNumberGenerator, OrderSnapshot, OrderStatus, PaymentStatus,
    Product, ORDER_NUMBER_ATTEMPTS,
};

const SELECT_ORDER: &str = r#"
    SELECT id, order_number, status, total_quantity, customer_id, applied_discount_id,
           delivery_address_line1, delivery_address_line2, delivery_address_closest_busstop,
           delivery_address_city, delivery_address_state, delivery_address_country,
           notes, created_at, updated_at
    FROM orders
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// Places an order: validates every line, reserves stock and persists
    /// the order with its items in one transaction.
    ///
    /// ## Errors
    /// * `OrderError::Validation` - bad item list, product, quantity or discount
    /// * `OrderError::UniqueIdExhausted` - every order-number candidate collided
    /// * `OrderError::StockConflict` - the guarded decrement matched no row
    /// * `OrderError::Db` - infrastructure failure
    pub async fn create(
        &self,
        customer_id: &str,
        request: &NewOrder,
        numbers: &dyn OrderNumberGenerator,
    ) -> Result<OrderSnapshot, OrderError> {
        validate_items_present(&request.items)?;
        validate_unique_products(&request.items)?;

        let now = Utc::now();
        let discounts = DiscountRepository::new(self.pool.clone());

        let order_discount = match &request.applied_discount {
            Some(code) => Some(discounts.resolve_active("applied_discount", code, now).await??),
            None => None,
        };

        let mut item_discounts = Vec::with_capacity(request.items.len());
        for (index, item) in request.items.iter().enumerate() {
            let resolved = match &item.applied_discount {
                Some(code) => {
                    let field = item_field(index, "applied_discount");
                    Some(discounts.resolve_active(&field, code, now).await??)
                }
                None => None,
            };
            item_discounts.push(resolved);
        }

        let order_id = Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        let order_number =
            insert_order(&mut tx, &order_id, customer_id, request, order_discount, numbers).await?;

        let mut total_quantity = 0i64;
        for (index, (item, discount_id)) in request.items.iter().zip(item_discounts).enumerate() {
            let product = sqlx::query_as::<_, Product>(
                r#"
                SELECT id, name, price_minor, stock_quantity, min_order_quantity,
                       allow_backorder, status, purchase_count, created_at, updated_at
                FROM products
                WHERE id = ?1
                "#,
            )
            .bind(&item.product)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| eshop_core::ValidationError::UnknownProduct {
                field: item_field(index, "product"),
                id: item.product.clone(),
            })?;

            let quantity = check_line(index, &product, item.quantity)?;

            let reserved = sqlx::query(
                r#"
                UPDATE products SET
                    stock_quantity = stock_quantity - ?2,
                    purchase_count = purchase_count + ?2,
                    updated_at = ?3
                WHERE id = ?1 AND stock_quantity >= ?2
                "#,
            )
            .bind(&product.id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if reserved.rows_affected() == 0 {
                warn!(product_id = %product.id, quantity, "Stock changed during order placement");
                return Err(OrderError::StockConflict {
                    product_id: product.id,
                });
            }

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, quantity, applied_discount_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order_id)
            .bind(&product.id)
            .bind(quantity)
            .bind(discount_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            total_quantity += quantity;
        }

        sqlx::query("UPDATE orders SET total_quantity = ?2 WHERE id = ?1")
            .bind(&order_id)
            .bind(total_quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            order_number = %order_number,
            customer_id = %customer_id,
            total_quantity,
            "Order placed"
        );

        self.snapshot_by_id(&order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", &order_id).into())
    }

    /// Undoes a placement whose payment could not be started.
    ///
    /// Deletes the order (items cascade) and gives the reserved stock and
    /// purchase counts back. Refuses orders that already have a payment row.
    pub async fn release(&self, order_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let items: Vec<(String, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = ?1")
                .bind(order_id)
                .fetch_all(&mut *tx)
                .await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM orders
            WHERE id = ?1
              AND NOT EXISTS (SELECT 1 FROM payments WHERE order_id = ?1)
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(DbError::not_found("Order (without payments)", order_id));
        }

        let now = Utc::now();
        for (product_id, quantity) in &items {
            sqlx::query(
                r#"
                UPDATE products SET
                    stock_quantity = stock_quantity + ?2,
                    purchase_count = MAX(purchase_count - ?2, 0),
                    updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(order_id = %order_id, items = items.len(), "Order released");
        Ok(())
    }

    // =========================================================================
    // Read Model
    // =========================================================================

    /// Gets an order row by ID.
    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Gets an order row, only if it belongs to `customer_id`.
    pub async fn get_owned(&self, customer_id: &str, order_id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "{SELECT_ORDER} WHERE id = ?1 AND customer_id = ?2"
        ))
        .bind(order_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    /// Order lines joined with current product name and price.
    pub async fn lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT oi.id, oi.product_id, p.name AS product_name,
                   p.price_minor AS unit_price_minor, oi.quantity, oi.applied_discount_id
            FROM order_items oi
            INNER JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ?1
            ORDER BY oi.created_at, oi.rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Status of the most recently created payment for the order.
    pub async fn latest_payment_status(&self, order_id: &str) -> DbResult<Option<PaymentStatus>> {
        let status = sqlx::query_scalar::<_, PaymentStatus>(
            r#"
            SELECT payment_status FROM payments
            WHERE order_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    /// Builds the snapshot for a loaded order row.
    pub async fn snapshot(&self, order: Order) -> DbResult<OrderSnapshot> {
        let lines = self.lines(&order.id).await?;
        let latest = self.latest_payment_status(&order.id).await?;
        Ok(OrderSnapshot::new(order, lines, latest))
    }

    /// Snapshot by order ID, regardless of owner.
    pub async fn snapshot_by_id(&self, order_id: &str) -> DbResult<Option<OrderSnapshot>> {
        match self.get_by_id(order_id).await? {
            Some(order) => Ok(Some(self.snapshot(order).await?)),
            None => Ok(None),
        }
    }

    /// Snapshot of a customer's own order. Another customer's order is
    /// reported as absent.
    pub async fn get_for_customer(
        &self,
        customer_id: &str,
        order_id: &str,
    ) -> DbResult<Option<OrderSnapshot>> {
        match self.get_owned(customer_id, order_id).await? {
            Some(order) => Ok(Some(self.snapshot(order).await?)),
            None => Ok(None),
        }
    }

    /// A customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<OrderSnapshot>> {
        debug!(customer_id = %customer_id, "Listing orders");

        let orders = sqlx::query_as::<_, Order>(&format!(
            "{SELECT_ORDER} WHERE customer_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut snapshots = Vec::with_capacity(orders.len());
        for order in orders {
            snapshots.push(self.snapshot(order).await?);
        }
        Ok(snapshots)
    }

    // =========================================================================
    // Administrative Transitions
    // =========================================================================

    /// Moves an order to `next` if the lifecycle allows it.
    ///
    /// Stock is not restored on cancel or return.
    pub async fn set_status(&self, order_id: &str, next: OrderStatus) -> Result<Order, OrderError> {
        let order = self
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        order
            .status
            .transition_to(next)
            .map_err(OrderError::Transition)?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(order_id)
        .bind(next)
        .bind(Utc::now())
        .bind(order.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("Order ({})", order.status), order_id).into());
        }

        info!(order_id = %order_id, from = %order.status, to = %next, "Order status changed");

        self.get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id).into())
    }
}

/// Inserts the order row, regenerating the order number on collision.
///
/// Every attempt runs in its own savepoint so a collision only rolls back
/// that INSERT. Returns the order number that was stored.
async fn insert_order(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: &str,
    customer_id: &str,
    request: &NewOrder,
    discount_id: Option<String>,
    numbers: &dyn OrderNumberGenerator,
) -> Result<String, OrderError> {
    let now = Utc::now();

    for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
        let candidate = numbers.generate().map_err(OrderError::OrderNumber)?;
        let mut savepoint = Connection::begin(&mut **tx).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, status, total_quantity, customer_id, applied_discount_id,
                delivery_address_line1, delivery_address_line2, delivery_address_closest_busstop,
                delivery_address_city, delivery_address_state, delivery_address_country,
                notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            "#,
        )
        .bind(order_id)
        .bind(&candidate)
        .bind(OrderStatus::Processing)
        .bind(customer_id)
        .bind(&discount_id)
        .bind(&request.delivery.line1)
        .bind(&request.delivery.line2)
        .bind(&request.delivery.closest_busstop)
        .bind(&request.delivery.city)
        .bind(&request.delivery.state)
        .bind(&request.delivery.country)
        .bind(&request.notes)
        .bind(now)
        .execute(&mut *savepoint)
        .await;

        match inserted {
            Ok(_) => {
                savepoint.commit().await?;
                debug!(order_number = %candidate, attempt, "Order number allocated");
                return Ok(candidate);
            }
            Err(err) => {
                let err = DbError::from(err);
                if !err.is_unique_violation_on("orders.order_number") {
                    return Err(err.into());
                }
                savepoint.rollback().await?;
                warn!(order_number = %candidate, attempt, "Order number collision, regenerating");
            }
        }
    }

    Err(OrderError::UniqueIdExhausted {
        attempts: ORDER_NUMBER_ATTEMPTS,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::test_support::{
        active_product, discount, file_db, line, memory_db, product, request,
    };
    use chrono::{DateTime, TimeZone};
    use eshop_core::order_number::{order_number_at, random_suffix};
    use eshop_core::{CoreResult, MinuteStampGenerator, OrderPaymentStatus, ProductStatus, ValidationError};
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out queued candidates, then repeats `fallback`.
    struct Scripted {
        queue: Mutex<VecDeque<String>>,
        fallback: String,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(queue: &[&str], fallback: &str) -> Self {
            Scripted {
                queue: Mutex::new(queue.iter().map(|s| s.to_string()).collect()),
                fallback: fallback.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OrderNumberGenerator for Scripted {
        fn generate(&self) -> CoreResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()))
        }
    }

    /// Production numbers, with the clock pinned to one minute.
    struct FrozenMinute(DateTime<Utc>);

    impl OrderNumberGenerator for FrozenMinute {
        fn generate(&self) -> CoreResult<String> {
            order_number_at(self.0, &random_suffix())
        }
    }

    /// Emits every candidate twice in a row, so every other order collides once.
    struct Stuttering {
        calls: AtomicUsize,
    }

    impl OrderNumberGenerator for Stuttering {
        fn generate(&self) -> CoreResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("BZRILBT-{:06X}", n / 2))
        }
    }

    async fn stock_of(db: &Database, id: &str) -> (i64, i64) {
        let p = db.products().get_by_id(id).await.unwrap().unwrap();
        (p.stock_quantity, p.purchase_count)
    }

    async fn order_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    fn validation(err: OrderError) -> ValidationError {
        match err {
            OrderError::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_places_order_and_reserves_stock() {
        let db = memory_db().await;
        let p = active_product(&db, 5, 2, 150_000).await;

        let snapshot = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(3))]), &MinuteStampGenerator)
            .await
            .unwrap();

        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.order.total_quantity, 3);
        assert_eq!(snapshot.order.status, OrderStatus::Processing);
        assert_eq!(snapshot.totals.total_amount.minor(), 450_000);
        assert_eq!(snapshot.payment_status, OrderPaymentStatus::Unpaid);
        assert!(snapshot.order.order_number.contains('-'));

        assert_eq!(stock_of(&db, &p.id).await, (2, 3));
    }

    #[tokio::test]
    async fn test_multi_item_order() {
        let db = memory_db().await;
        let a = active_product(&db, 10, 1, 1_000).await;
        let b = active_product(&db, 10, 1, 2_500).await;
        let c = active_product(&db, 10, 4, 300).await;

        let snapshot = db
            .orders()
            .create(
                "cust-1",
                &request(vec![line(&a, Some(1)), line(&b, Some(2)), line(&c, None)]),
                &MinuteStampGenerator,
            )
            .await
            .unwrap();

        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.order.total_quantity, 7);
        assert_eq!(snapshot.totals.subtotal.minor(), 1_000 + 5_000 + 1_200);

        assert_eq!(stock_of(&db, &a.id).await, (9, 1));
        assert_eq!(stock_of(&db, &b.id).await, (8, 2));
        assert_eq!(stock_of(&db, &c.id).await, (6, 4));
    }

    #[tokio::test]
    async fn test_out_of_stock_persists_nothing() {
        let db = memory_db().await;
        let p = active_product(&db, 0, 1, 1_000).await;

        let err = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(1))]), &MinuteStampGenerator)
            .await
            .unwrap_err();

        assert_eq!(validation(err).to_string(), "This product is out of stock");
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_below_moq_names_the_moq() {
        let db = memory_db().await;
        let p = active_product(&db, 5, 2, 1_000).await;

        let err = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(1))]), &MinuteStampGenerator)
            .await
            .unwrap_err();

        let v = validation(err);
        assert_eq!(v.field(), "items[0].quantity");
        assert!(v.to_string().contains("MOQ"));
        assert!(v.to_string().contains('2'));
    }

    #[tokio::test]
    async fn test_duplicate_product_and_empty_items() {
        let db = memory_db().await;
        let p = active_product(&db, 5, 1, 1_000).await;

        let err = db
            .orders()
            .create(
                "cust-1",
                &request(vec![line(&p, Some(1)), line(&p, Some(2))]),
                &MinuteStampGenerator,
            )
            .await
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::DuplicateProduct { .. }));

        let err = db
            .orders()
            .create("cust-1", &request(vec![]), &MinuteStampGenerator)
            .await
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::EmptyItems { .. }));

        assert_eq!(order_count(&db).await, 0);
        assert_eq!(stock_of(&db, &p.id).await, (5, 0));
    }

    #[tokio::test]
    async fn test_failing_second_line_rolls_back_first() {
        let db = memory_db().await;
        let good = active_product(&db, 5, 1, 1_000).await;
        let draft = product(5, 1, false, ProductStatus::Draft, 1_000);
        db.products().insert(&draft).await.unwrap();

        let err = db
            .orders()
            .create(
                "cust-1",
                &request(vec![line(&good, Some(2)), line(&draft, Some(1))]),
                &MinuteStampGenerator,
            )
            .await
            .unwrap_err();

        let v = validation(err);
        assert!(matches!(v, ValidationError::ProductDraft { .. }));
        assert_eq!(v.field(), "items[1].product");

        assert_eq!(order_count(&db).await, 0);
        assert_eq!(stock_of(&db, &good.id).await, (5, 0));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = memory_db().await;
        let ghost = product(5, 1, false, ProductStatus::Active, 1_000);

        let err = db
            .orders()
            .create("cust-1", &request(vec![line(&ghost, Some(1))]), &MinuteStampGenerator)
            .await
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::UnknownProduct { .. }));
    }

    #[tokio::test]
    async fn test_backorder_product_still_capped_by_stock() {
        let db = memory_db().await;
        let p = product(0, 1, true, ProductStatus::Active, 1_000);
        db.products().insert(&p).await.unwrap();

        let err = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(1))]), &MinuteStampGenerator)
            .await
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::InsufficientStock { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_never_oversell() {
        let (_dir, db) = file_db(8).await;
        let p = active_product(&db, 5, 1, 1_000).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let db = db.clone();
            let req = request(vec![line(&p, Some(1))]);
            handles.push(tokio::spawn(async move {
                db.orders()
                    .create(&format!("cust-{i}"), &req, &MinuteStampGenerator)
                    .await
            }));
        }

        let mut placed = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(OrderError::Validation(_) | OrderError::StockConflict { .. }) => refused += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(refused, 15);
        assert_eq!(order_count(&db).await, 5);
        assert_eq!(stock_of(&db, &p.id).await, (0, 5));
    }

    #[tokio::test]
    async fn test_collision_is_retried_with_new_number() {
        let db = memory_db().await;
        let p = active_product(&db, 10, 1, 1_000).await;

        db.orders()
            .create("cust-1", &request(vec![line(&p, Some(1))]), &Scripted::new(&[], "AAAA-000001"))
            .await
            .unwrap();

        let numbers = Scripted::new(&["AAAA-000001", "AAAA-000001"], "AAAA-000002");
        let snapshot = db
            .orders()
            .create("cust-2", &request(vec![line(&p, Some(1))]), &numbers)
            .await
            .unwrap();

        assert_eq!(snapshot.order.order_number, "AAAA-000002");
        assert_eq!(numbers.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stock_of(&db, &p.id).await, (8, 2));
    }

    #[tokio::test]
    async fn test_exhausted_order_numbers() {
        let db = memory_db().await;
        let p = active_product(&db, 10, 1, 1_000).await;

        db.orders()
            .create("cust-1", &request(vec![line(&p, Some(1))]), &Scripted::new(&[], "AAAA-000001"))
            .await
            .unwrap();

        let numbers = Scripted::new(&[], "AAAA-000001");
        let err = db
            .orders()
            .create("cust-2", &request(vec![line(&p, Some(1))]), &numbers)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::UniqueIdExhausted { attempts: 5 }));
        assert_eq!(numbers.calls.load(Ordering::SeqCst), ORDER_NUMBER_ATTEMPTS);
        assert_eq!(order_count(&db).await, 1);
        assert_eq!(stock_of(&db, &p.id).await, (9, 1));
    }

    #[tokio::test]
    async fn test_collisions_never_reach_storage() {
        let db = memory_db().await;
        let p = active_product(&db, 1_000, 1, 100).await;
        let numbers = Stuttering {
            calls: AtomicUsize::new(0),
        };

        for i in 0..200 {
            db.orders()
                .create(&format!("cust-{i}"), &request(vec![line(&p, Some(1))]), &numbers)
                .await
                .unwrap();
        }

        let stored: Vec<String> = sqlx::query_scalar("SELECT order_number FROM orders")
            .fetch_all(db.pool())
            .await
            .unwrap();
        let unique: HashSet<_> = stored.iter().collect();
        assert_eq!(stored.len(), 200);
        assert_eq!(unique.len(), 200);
        assert_eq!(stock_of(&db, &p.id).await, (800, 200));
    }

    #[tokio::test]
    async fn test_ten_thousand_orders_in_one_minute() {
        let db = memory_db().await;
        let p = active_product(&db, 10_000, 1, 100).await;
        let numbers = FrozenMinute(Utc.with_ymd_and_hms(2026, 10, 19, 14, 7, 0).unwrap());
        let req = request(vec![line(&p, Some(1))]);

        for _ in 0..10_000 {
            db.orders().create("cust-1", &req, &numbers).await.unwrap();
        }

        let stored: Vec<String> = sqlx::query_scalar("SELECT order_number FROM orders")
            .fetch_all(db.pool())
            .await
            .unwrap();
        let unique: HashSet<_> = stored.iter().collect();
        let prefixes: HashSet<_> = stored.iter().filter_map(|n| n.split_once('-')).map(|(head, _)| head).collect();

        assert_eq!(stored.len(), 10_000);
        assert_eq!(unique.len(), 10_000);
        assert_eq!(prefixes.len(), 1);
        assert_eq!(stock_of(&db, &p.id).await, (0, 10_000));
    }

    #[tokio::test]
    async fn test_discount_codes_are_checked() {
        let db = memory_db().await;
        let p = active_product(&db, 10, 1, 1_000).await;
        let d = discount("WELCOME10", None, 0, true);
        db.discounts().insert(&d).await.unwrap();
        db.discounts()
            .insert(&discount("OFF", None, 0, false))
            .await
            .unwrap();

        let mut req = request(vec![line(&p, Some(1))]);
        req.applied_discount = Some("WELCOME10".to_string());
        let snapshot = db
            .orders()
            .create("cust-1", &req, &MinuteStampGenerator)
            .await
            .unwrap();
        assert_eq!(snapshot.order.applied_discount_id.as_deref(), Some(d.id.as_str()));
        assert!(snapshot.totals.discounts.is_zero());

        let mut req = request(vec![line(&p, Some(1))]);
        req.items[0].applied_discount = Some("OFF".to_string());
        let err = db
            .orders()
            .create("cust-1", &req, &MinuteStampGenerator)
            .await
            .unwrap_err();
        assert_eq!(validation(err).field(), "items[0].applied_discount");
    }

    #[tokio::test]
    async fn test_release_restores_stock() {
        let db = memory_db().await;
        let p = active_product(&db, 5, 1, 1_000).await;

        let snapshot = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(4))]), &MinuteStampGenerator)
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &p.id).await, (1, 4));

        db.orders().release(&snapshot.order.id).await.unwrap();

        assert_eq!(stock_of(&db, &p.id).await, (5, 0));
        assert_eq!(order_count(&db).await, 0);
        assert!(db.orders().release(&snapshot.order.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reads_are_scoped_to_customer() {
        let db = memory_db().await;
        let p = active_product(&db, 10, 1, 1_000).await;

        let mine = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(1))]), &MinuteStampGenerator)
            .await
            .unwrap();
        db.orders()
            .create("cust-1", &request(vec![line(&p, Some(2))]), &MinuteStampGenerator)
            .await
            .unwrap();
        db.orders()
            .create("cust-2", &request(vec![line(&p, Some(1))]), &MinuteStampGenerator)
            .await
            .unwrap();

        let listed = db.orders().list_for_customer("cust-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order.total_quantity, 2, "newest first");

        assert!(db
            .orders()
            .get_for_customer("cust-1", &mine.order.id)
            .await
            .unwrap()
            .is_some());
        assert!(db
            .orders()
            .get_for_customer("cust-2", &mine.order.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_admin_status_transitions() {
        let db = memory_db().await;
        let p = active_product(&db, 10, 1, 1_000).await;
        let snapshot = db
            .orders()
            .create("cust-1", &request(vec![line(&p, Some(3))]), &MinuteStampGenerator)
            .await
            .unwrap();
        let id = snapshot.order.id;

        let order = db.orders().set_status(&id, OrderStatus::Fulfilled).await.unwrap();
        assert_eq!(order.status, OrderStatus::Fulfilled);

        let err = db.orders().set_status(&id, OrderStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, OrderError::Transition(_)));

        let order = db.orders().set_status(&id, OrderStatus::Returned).await.unwrap();
        assert_eq!(order.status, OrderStatus::Returned);

        // No restock on return.
        assert_eq!(stock_of(&db, &p.id).await, (7, 3));
    }
}
