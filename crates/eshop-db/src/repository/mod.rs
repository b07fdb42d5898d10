//! # Repository Module
//!
//! Database repository implementations for eshop.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / reconciliation engine                                  │
//! │       │                                                                 │
//! │       │  db.orders().create(customer, request, generator)              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create(..)            one transaction: order + items + stock      │
//! │  ├── release(..)           compensating delete + stock restore         │
//! │  ├── get_for_customer(..)  scoped snapshot                             │
//! │  └── set_status(..)        administrative transition                   │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product reads, inserts, restock
//! - [`DiscountRepository`](discount::DiscountRepository) - Discount code lookup
//! - [`OrderRepository`](order::OrderRepository) - Order placement and read model
//! - [`PaymentRepository`](payment::PaymentRepository) - Payment rows and idempotent settlement

pub mod discount;
pub mod order;
pub mod payment;
pub mod product;
