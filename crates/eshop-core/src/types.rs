//! # Domain Types
//!
//! Core domain types used throughout eshop.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_minor    │◄──│  order_number   │◄──│  order_id (FK)  │       │
//! │  │  stock_quantity │   │  status         │   │  reference      │       │
//! │  │  min_order_qty  │   │  total_quantity │   │  payment_status │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │           ▲                     │ owns (cascade)                        │
//! │           │            ┌────────┴────────┐   ┌─────────────────┐       │
//! │           └────────────│   OrderItem     │   │    Discount     │       │
//! │                        │  quantity ≥ 1   │──►│  code (unique)  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (order_number, payment reference, discount code) - human-facing
//!
//! ## Derived, Never Stored
//! Order money totals are computed from the item set on every read
//! (see [`OrderTotals`]). The only denormalized aggregate on an order is
//! `total_quantity`, written once inside the creation transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// Catalog status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Being authored, not orderable.
    Draft,
    /// Listed and orderable.
    Active,
    /// Withdrawn from sale.
    Archived,
}

/// A product as seen by the order path.
///
/// The catalog owns products; ordering only reads them and moves
/// `stock_quantity` / `purchase_count` through the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price in minor currency units.
    pub price_minor: i64,

    /// Units on hand. Never negative (enforced by a CHECK constraint).
    pub stock_quantity: i64,

    /// Smallest quantity a single order line may request (MOQ).
    pub min_order_quantity: i64,

    /// Whether the product may be ordered once stock reaches zero.
    pub allow_backorder: bool,

    pub status: ProductStatus,

    /// Units sold through placed orders.
    pub purchase_count: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How a discount's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    Fixed,
    FreeShipping,
    NewUser,
    FirstOrder,
}

/// A discount that orders and order lines may reference by code.
///
/// Discount amounts are not applied to totals yet; the order path only
/// checks that a referenced discount exists and is usable right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Discount {
    pub id: String,
    /// Unique code. `None` for automatic discounts.
    pub code: Option<String>,
    pub name: String,
    pub kind: DiscountKind,
    /// Percent (whole number) or minor-unit amount depending on `kind`.
    pub value: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// `None` means no usage cap.
    pub total_usage_limit: Option<i64>,
    pub usage_count: i64,
    /// Manual on/off switch.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Discount {
    /// Whether the discount can be applied at `now`.
    ///
    /// Recomputed on every call; never cache the result.
    ///
    /// ```text
    /// is_active
    ///   ∧ (total_usage_limit is None ∨ usage_count < total_usage_limit)
    ///   ∧ starts_at < now < ends_at
    /// ```
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        let under_limit = match self.total_usage_limit {
            Some(limit) => self.usage_count < limit,
            None => true,
        };
        self.is_active && under_limit && self.starts_at < now && now < self.ends_at
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of an order.
///
/// ## Lifecycle
/// ```text
///   processing ──► fulfilled ──► returned
///       │
///       └────────► cancelled
/// ```
/// Customers never set this directly; only administrative transitions do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Processing,
    Fulfilled,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// Lower-case name, as stored and serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    /// Validates an administrative status change.
    ///
    /// ## Example
    /// ```rust
    /// use eshop_core::OrderStatus;
    ///
    /// assert!(OrderStatus::Processing.transition_to(OrderStatus::Fulfilled).is_ok());
    /// assert!(OrderStatus::Cancelled.transition_to(OrderStatus::Fulfilled).is_err());
    /// ```
    pub fn transition_to(self, next: OrderStatus) -> CoreResult<OrderStatus> {
        use OrderStatus::*;
        match (self, next) {
            (Processing, Fulfilled) | (Processing, Cancelled) | (Fulfilled, Returned) => Ok(next),
            _ => Err(CoreError::InvalidOrderTransition {
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Processing
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// Where an order is delivered. Opaque strings; no address validation.
///
/// Serialized with the `delivery_address_` prefix used on the order row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryAddress {
    #[serde(rename = "delivery_address_line1")]
    pub line1: String,
    #[serde(rename = "delivery_address_line2", default)]
    pub line2: String,
    #[serde(rename = "delivery_address_closest_busstop")]
    pub closest_busstop: String,
    #[serde(rename = "delivery_address_city")]
    pub city: String,
    #[serde(rename = "delivery_address_state")]
    pub state: String,
    #[serde(rename = "delivery_address_country")]
    pub country: String,
}

/// A placed order.
///
/// `order_number` is unique and never changes after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    /// Human-facing identifier, e.g. `BQ4XN-3FA91C`.
    pub order_number: String,
    pub status: OrderStatus,
    /// Sum of item quantities, written once at creation.
    pub total_quantity: i64,
    pub customer_id: String,
    pub applied_discount_id: Option<String>,
    pub delivery_address_line1: String,
    pub delivery_address_line2: String,
    pub delivery_address_closest_busstop: String,
    pub delivery_address_city: String,
    pub delivery_address_state: String,
    pub delivery_address_country: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order Item
// =============================================================================

/// One product line of an order. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub applied_discount_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order item joined with the product data needed to price it.
///
/// Prices are read live from the product, so the subtotal follows the
/// catalog price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub quantity: i64,
    pub applied_discount_id: Option<String>,
}

impl OrderLine {
    /// `unit price × quantity`.
    pub fn subtotal(&self) -> Money {
        Money::from_minor(self.unit_price_minor).multiply_quantity(self.quantity)
    }

    /// `"3 unit(s) of Plantain Chips"`
    pub fn title(&self) -> String {
        format!("{} unit(s) of {}", self.quantity, self.product_name)
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Money totals of an order, derived from its lines.
///
/// ```text
/// total_amount = (subtotal − discounts) + delivery_fee + other_fees
/// ```
/// `discounts`, `delivery_fee` and `other_fees` are zero until pricing
/// rules for them exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discounts: Money,
    pub delivery_fee: Money,
    pub other_fees: Money,
    pub total_amount: Money,
}

impl OrderTotals {
    /// Computes totals from the current order lines.
    pub fn from_lines(lines: &[OrderLine]) -> Self {
        let subtotal: Money = lines.iter().map(OrderLine::subtotal).sum();
        let discounts = Money::zero();
        let delivery_fee = Money::zero();
        let other_fees = Money::zero();

        OrderTotals {
            subtotal,
            discounts,
            delivery_fee,
            other_fees,
            total_amount: (subtotal - discounts) + delivery_fee + other_fees,
        }
    }

    /// Whether the customer owes anything for this order.
    pub fn requires_payment(&self) -> bool {
        self.total_amount.is_positive()
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement status of a single payment attempt.
///
/// ## Lifecycle
/// ```text
///   pending ──► paid ──► refunded
///      │         ▲
///      ▼         │ (late gateway success)
///   cancelled ───┘
/// ```
/// `paid` is only left through an explicit refund. A gateway success
/// never overwrites `refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Cancelled,
        PaymentStatus::Refunded,
    ];

    /// Lower-case name, as stored and serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Whether a gateway-reported success moves this payment to `paid`.
    ///
    /// Only `pending` and `cancelled` settle. `paid` is already there and
    /// `refunded` must stay refunded.
    pub const fn settles_on_success(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Cancelled)
    }

    /// Statuses a gateway-reported success moves to `paid`.
    pub fn settling() -> impl Iterator<Item = PaymentStatus> {
        PaymentStatus::ALL.into_iter().filter(PaymentStatus::settles_on_success)
    }

    /// `pending → cancelled`.
    pub fn cancel(self) -> CoreResult<PaymentStatus> {
        match self {
            PaymentStatus::Pending => Ok(PaymentStatus::Cancelled),
            _ => Err(CoreError::InvalidPaymentTransition {
                from: self.to_string(),
                to: PaymentStatus::Cancelled.to_string(),
            }),
        }
    }

    /// `paid → refunded`.
    pub fn refund(self) -> CoreResult<PaymentStatus> {
        match self {
            PaymentStatus::Paid => Ok(PaymentStatus::Refunded),
            _ => Err(CoreError::InvalidPaymentTransition {
                from: self.to_string(),
                to: PaymentStatus::Refunded.to_string(),
            }),
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment
// =============================================================================

/// One gateway transaction attempt for an order.
///
/// An order can have many payments over time (retries); the most recent one
/// by creation time decides the order's payment status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    /// Gateway-assigned reference. Unique.
    pub reference: String,
    /// Amount in minor units, exactly as sent to the gateway.
    pub amount_minor: i64,
    pub payment_status: PaymentStatus,
    /// Set once the gateway has confirmed the charge. Never cleared.
    pub verified: bool,
    /// ISO 4217 code, e.g. `NGN`.
    pub currency: String,
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_minor(self.amount_minor)
    }
}

/// Payment status as reported on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    /// No payment attempt exists yet.
    Unpaid,
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl From<Option<PaymentStatus>> for OrderPaymentStatus {
    fn from(latest: Option<PaymentStatus>) -> Self {
        match latest {
            None => OrderPaymentStatus::Unpaid,
            Some(PaymentStatus::Pending) => OrderPaymentStatus::Pending,
            Some(PaymentStatus::Paid) => OrderPaymentStatus::Paid,
            Some(PaymentStatus::Cancelled) => OrderPaymentStatus::Cancelled,
            Some(PaymentStatus::Refunded) => OrderPaymentStatus::Refunded,
        }
    }
}

impl OrderPaymentStatus {
    /// Whether a new payment attempt may be started for the order.
    pub const fn accepts_new_payment(&self) -> bool {
        !matches!(self, OrderPaymentStatus::Paid | OrderPaymentStatus::Refunded)
    }
}

// =============================================================================
// Order Snapshot
// =============================================================================

/// Read model of an order: the row, its lines, derived totals and the
/// current payment status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub payment_status: OrderPaymentStatus,
}

impl OrderSnapshot {
    /// Assembles a snapshot, deriving totals from `items`.
    pub fn new(order: Order, items: Vec<OrderLine>, latest_payment: Option<PaymentStatus>) -> Self {
        let totals = OrderTotals::from_lines(&items);
        OrderSnapshot {
            order,
            items,
            totals,
            payment_status: latest_payment.into(),
        }
    }
}

// =============================================================================
// Order Request
// =============================================================================

/// One requested line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product: String,
    /// Defaults to the product's minimum order quantity when absent.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Discount code.
    #[serde(default)]
    pub applied_discount: Option<String>,
}

/// Everything needed to place an order for a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
    #[serde(flatten)]
    pub delivery: DeliveryAddress,
    #[serde(default)]
    pub notes: String,
    /// Order-level discount code.
    #[serde(default)]
    pub applied_discount: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn discount(limit: Option<i64>, used: i64, active: bool) -> Discount {
        let now = Utc::now();
        Discount {
            id: "d1".to_string(),
            code: Some("WELCOME10".to_string()),
            name: "Welcome".to_string(),
            kind: DiscountKind::Percent,
            value: 10,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            total_usage_limit: limit,
            usage_count: used,
            is_active: active,
            created_at: now,
        }
    }

    fn line(price: i64, qty: i64) -> OrderLine {
        OrderLine {
            id: "i".to_string(),
            product_id: "p".to_string(),
            product_name: "Plantain Chips".to_string(),
            unit_price_minor: price,
            quantity: qty,
            applied_discount_id: None,
        }
    }

    #[test]
    fn test_discount_active_window_and_limit() {
        let now = Utc::now();
        assert!(discount(None, 0, true).is_active_at(now));
        assert!(discount(Some(5), 4, true).is_active_at(now));
        assert!(!discount(Some(5), 5, true).is_active_at(now));
        assert!(!discount(None, 0, false).is_active_at(now));
        assert!(!discount(None, 0, true).is_active_at(now + Duration::days(2)));
        assert!(!discount(None, 0, true).is_active_at(now - Duration::days(2)));
    }

    #[test]
    fn test_order_transitions() {
        use OrderStatus::*;
        assert_eq!(Processing.transition_to(Fulfilled).unwrap(), Fulfilled);
        assert_eq!(Processing.transition_to(Cancelled).unwrap(), Cancelled);
        assert_eq!(Fulfilled.transition_to(Returned).unwrap(), Returned);

        assert!(Cancelled.transition_to(Fulfilled).is_err());
        assert!(Processing.transition_to(Returned).is_err());
        assert!(Returned.transition_to(Processing).is_err());
        assert!(Processing.transition_to(Processing).is_err());
    }

    #[test]
    fn test_gateway_success_is_forward_only() {
        use PaymentStatus::*;
        assert!(Pending.settles_on_success());
        assert!(Cancelled.settles_on_success());
        assert!(!Paid.settles_on_success());
        assert!(!Refunded.settles_on_success());

        let settling: Vec<_> = PaymentStatus::settling().collect();
        assert_eq!(settling, vec![Pending, Cancelled]);
    }

    #[test]
    fn test_payment_admin_transitions() {
        use PaymentStatus::*;
        assert_eq!(Pending.cancel().unwrap(), Cancelled);
        assert_eq!(Paid.refund().unwrap(), Refunded);
        assert!(Paid.cancel().is_err());
        assert!(Pending.refund().is_err());
        assert!(Refunded.refund().is_err());
    }

    #[test]
    fn test_totals_from_lines() {
        let totals = OrderTotals::from_lines(&[line(1500, 3), line(250, 2)]);
        assert_eq!(totals.subtotal.minor(), 5000);
        assert!(totals.discounts.is_zero());
        assert_eq!(totals.total_amount.minor(), 5000);
        assert!(totals.requires_payment());

        let free = OrderTotals::from_lines(&[line(0, 4)]);
        assert!(!free.requires_payment());
    }

    #[test]
    fn test_order_payment_status_follows_latest() {
        assert_eq!(OrderPaymentStatus::from(None), OrderPaymentStatus::Unpaid);
        assert_eq!(
            OrderPaymentStatus::from(Some(PaymentStatus::Paid)),
            OrderPaymentStatus::Paid
        );
        assert!(OrderPaymentStatus::Unpaid.accepts_new_payment());
        assert!(OrderPaymentStatus::Cancelled.accepts_new_payment());
        assert!(!OrderPaymentStatus::Paid.accepts_new_payment());
        assert!(!OrderPaymentStatus::Refunded.accepts_new_payment());
    }

    #[test]
    fn test_line_title() {
        assert_eq!(line(100, 3).title(), "3 unit(s) of Plantain Chips");
    }

    #[test]
    fn test_new_order_defaults() {
        let json = r#"{
            "items": [{"product": "p1"}],
            "delivery_address_line1": "1 Marina Rd",
            "delivery_address_closest_busstop": "CMS",
            "delivery_address_city": "Lagos",
            "delivery_address_state": "Lagos",
            "delivery_address_country": "NG"
        }"#;
        let req: NewOrder = serde_json::from_str(json).unwrap();
        assert_eq!(req.items.len(), 1);
        assert!(req.items[0].quantity.is_none());
        assert_eq!(req.delivery.line2, "");
        assert!(req.applied_discount.is_none());
    }
}
