//! # eshop-db: Database Layer for eshop
//!
//! This crate provides database access for the order and payment core.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          eshop Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)   ReconciliationEngine (webhook)      │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     eshop-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PaymentRepo   │    │ 001_init.sql │  │   │
//! │  │   │ busy_timeout  │    │ ProductRepo   │    │ ...          │  │   │
//! │  │   │               │    │ DiscountRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   DATABASE_PATH, default ./eshop.db                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and order error types
//! - [`repository`] - Repository implementations (order, payment, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use eshop_core::MinuteStampGenerator;
//! use eshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./eshop.db")).await?;
//!
//! let snapshot = db.orders().create(&customer_id, &request, &MinuteStampGenerator).await?;
//! let (payment, transitioned) = db.payments().apply_gateway_success(&reference).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, OrderError};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::discount::DiscountRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::product::ProductRepository;
