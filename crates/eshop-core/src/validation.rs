//! # Validation Module
//!
//! Inventory ledger rules for order placement.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum Json extractor)                                   │
//! │  └── Shape and type checks (deserialization)                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (pure, no I/O)                                   │
//! │  ├── Item list not empty, no product listed twice                      │
//! │  └── Product status, stock, MOQ against the row read in the            │
//! │      order transaction                                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── Conditional decrement (stock_quantity >= qty)                     │
//! │  ├── CHECK (stock_quantity >= 0)                                       │
//! │  └── UNIQUE (order_id, product_id), UNIQUE (order_number)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use eshop_core::validation::{validate_items_present, validate_unique_products};
//! # let items = vec![];
//!
//! validate_items_present(&items).unwrap();
//! validate_unique_products(&items).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{NewOrderItem, Product, ProductStatus};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Request path of a field on the `index`-th order item.
pub fn item_field(index: usize, name: &str) -> String {
    format!("items[{}].{}", index, name)
}

// =============================================================================
// Item List Validators
// =============================================================================

/// Rejects an order with no items.
///
/// ## Example
/// ```rust
/// use eshop_core::validation::validate_items_present;
///
/// assert!(validate_items_present(&[]).is_err());
/// ```
pub fn validate_items_present(items: &[NewOrderItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::EmptyItems {
            field: "items".to_string(),
        });
    }
    Ok(())
}

/// Rejects a request that lists the same product more than once.
///
/// The error points at the second occurrence.
pub fn validate_unique_products(items: &[NewOrderItem]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if !seen.insert(item.product.as_str()) {
            return Err(ValidationError::DuplicateProduct {
                field: item_field(index, "product"),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Inventory Ledger Check
// =============================================================================

/// Validates one order line against the product row and returns the
/// quantity to reserve.
///
/// ## Rules (in order)
/// 1. `archived` / `draft` products are not orderable
/// 2. zero stock without backorder is out of stock
/// 3. quantity defaults to the MOQ when not supplied
/// 4. quantity must be positive and at least the MOQ
/// 5. quantity must not exceed `stock_quantity`
///
/// Rule 5 applies even when `allow_backorder` is set, so a backorder
/// product can only be ordered up to its remaining stock.
///
/// ## Example
/// ```rust,ignore
/// // stock 5, MOQ 2
/// assert_eq!(check_line(0, &product, Some(3))?, 3);
/// assert_eq!(check_line(0, &product, None)?, 2);
/// ```
pub fn check_line(index: usize, product: &Product, requested: Option<i64>) -> ValidationResult<i64> {
    match product.status {
        ProductStatus::Archived => {
            return Err(ValidationError::ProductArchived {
                field: item_field(index, "product"),
            })
        }
        ProductStatus::Draft => {
            return Err(ValidationError::ProductDraft {
                field: item_field(index, "product"),
            })
        }
        ProductStatus::Active => {}
    }

    if product.stock_quantity == 0 && !product.allow_backorder {
        return Err(ValidationError::OutOfStock {
            field: item_field(index, "product"),
        });
    }

    let quantity = requested.unwrap_or(product.min_order_quantity);

    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: item_field(index, "quantity"),
        });
    }

    if quantity < product.min_order_quantity {
        return Err(ValidationError::BelowMinimumQuantity {
            field: item_field(index, "quantity"),
            moq: product.min_order_quantity,
        });
    }

    if quantity > product.stock_quantity {
        return Err(ValidationError::InsufficientStock {
            field: item_field(index, "quantity"),
        });
    }

    Ok(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================
