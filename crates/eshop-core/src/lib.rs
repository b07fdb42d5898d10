//! # eshop-core: Pure Business Logic for eshop
//!
//! This crate is the **heart** of the order placement and payment
//! reconciliation workflow. It contains the business rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        eshop Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    POST /orders ──► GET /payments/verify ◄── POST webhook       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              eshop-payments (gateway + reconciliation)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ eshop-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │order_number│  │ validation│  │   │
//! │  │   │  Order    │  │   Money   │  │  encode    │  │ MOQ/stock │  │   │
//! │  │   │  Payment  │  │           │  │  generate  │  │ duplicates│  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    eshop-db (Database Layer)                    │   │
//! │  │         SQLite queries, migrations, transactional order build   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Payment, etc.) and status machines
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Inventory ledger rules
//! - [`order_number`] - Human-facing order identifiers
//! - [`gateway`] - Payment gateway wire and webhook event types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//!    (the order-number generator takes the clock as an argument where it matters)
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in minor units (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use eshop_core::{Money, PaymentStatus};
//!
//! let price = Money::from_minor(150_000);
//! assert_eq!(price.multiply_quantity(3).to_major_string(), "4500.00");
//!
//! // A late gateway success never un-refunds a payment.
//! assert!(!PaymentStatus::Refunded.settles_on_success());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod gateway;
pub mod money;
pub mod order_number;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use eshop_core::Money` instead of
// `use eshop_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order_number::{generate_order_number, MinuteStampGenerator, OrderNumberGenerator};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// How many order numbers the order repository tries before giving up.
///
/// Every attempt is identical: generate, insert inside a savepoint, roll the
/// savepoint back on an `order_number` conflict.
pub const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Store currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "NGN";
