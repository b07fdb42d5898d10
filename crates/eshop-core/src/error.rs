//! # Error Types
//!
//! Domain-specific error types for eshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  eshop-core errors (this file)                                         │
//! │  ├── CoreError        - Illegal status transitions                     │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  eshop-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── OrderError       - Order build outcome (validation / exhausted)   │
//! │                                                                         │
//! │  eshop-payments errors (separate crate)                                │
//! │  └── GatewayError / ReconcileError / WebhookRejection                  │
//! │                                                                         │
//! │  HTTP errors (in app)                                                  │
//! │  └── ApiError         - What the client sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → OrderError → ApiError → Client                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every validation failure names the field it belongs to
//! 3. Errors are enum variants, never String
//! 4. The Display text is the user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An order status change that the order lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Fulfilling an order that was already cancelled
    /// - Returning an order that was never fulfilled
    #[error("Order cannot move from {from} to {to}")]
    InvalidOrderTransition { from: String, to: String },

    /// A payment status change that the payment lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Refunding a payment that is still pending
    /// - Cancelling a payment that has already been paid
    #[error("Payment cannot move from {from} to {to}")]
    InvalidPaymentTransition { from: String, to: String },

    /// The order-number encoder could not produce an identifier.
    #[error("Order number encoding failed: {reason}")]
    OrderNumber { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each variant carries the `field` it applies to, using the request path
/// (`items`, `items[1].quantity`, `applied_discount`). The Display text is
/// safe to return to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("This field is required")]
    Required { field: String },

    /// An order was submitted without any line items.
    #[error("An order must contain at least one item")]
    EmptyItems { field: String },

    /// The same product appears twice in one order request.
    #[error("Product already added to order. Increase the quantity instead")]
    DuplicateProduct { field: String },

    /// A referenced product does not exist.
    #[error("Product '{id}' does not exist")]
    UnknownProduct { field: String, id: String },

    /// The product has been archived.
    #[error("Product unavailable (Archived)")]
    ProductArchived { field: String },

    /// The product is still in draft.
    #[error("Can not order a product in draft")]
    ProductDraft { field: String },

    /// Stock is zero and the product does not allow backorder.
    #[error("This product is out of stock")]
    OutOfStock { field: String },

    /// Quantity below the product's minimum order quantity.
    #[error("Min order quantity (MOQ) for this product is {moq}")]
    BelowMinimumQuantity { field: String, moq: i64 },

    /// Quantity exceeds what is in stock.
    #[error("Not enough stock to fulfil order")]
    InsufficientStock { field: String },

    /// Value must be positive.
    #[error("Ensure this value is greater than zero")]
    MustBePositive { field: String },

    /// A referenced discount code does not exist.
    #[error("Discount code '{code}' does not exist")]
    UnknownDiscount { field: String, code: String },

    /// A discount exists but is not currently usable.
    #[error("Discount code '{code}' is not active")]
    InactiveDiscount { field: String, code: String },

    /// Invalid format (e.g., malformed email).
    #[error("Invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Returns the request path of the field that failed.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::EmptyItems { field }
            | ValidationError::DuplicateProduct { field }
            | ValidationError::UnknownProduct { field, .. }
            | ValidationError::ProductArchived { field }
            | ValidationError::ProductDraft { field }
            | ValidationError::OutOfStock { field }
            | ValidationError::BelowMinimumQuantity { field, .. }
            | ValidationError::InsufficientStock { field }
            | ValidationError::MustBePositive { field }
            | ValidationError::UnknownDiscount { field, .. }
            | ValidationError::InactiveDiscount { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
