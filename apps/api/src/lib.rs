//! # eshop API
//!
//! HTTP surface for order placement and payment reconciliation.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            API Routes                                   │
//! │                                                                         │
//! │  ┌────────────────────────────┐  ┌────────────────────────────────────┐│
//! │  │  Orders (bearer)           │  │  Payments                          ││
//! │  │                            │  │                                    ││
//! │  │ • POST /api/orders         │  │ • GET  /api/payments/verify/{ref}  ││
//! │  │ • GET  /api/orders         │  │ • POST /api/payments/{ref}/cancel  ││
//! │  │ • GET  /api/orders/{id}    │  │   (bearer)                         ││
//! │  │ • POST /api/orders/{id}/   │  │ • POST /api/payments/webhook       ││
//! │  │        payments            │  │   (IP allow-list + HMAC)           ││
//! │  └────────────────────────────┘  └────────────────────────────────────┘│
//! │                                                                         │
//! │  GET /health                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP server port (default: 8000)
//! - `DATABASE_PATH` - SQLite file (default: ./eshop.db)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `PAYSTACK_SECRET_KEY` - Gateway secret key (required)
//! - `PAYSTACK_BASE_URL` - Gateway API root (default: https://api.paystack.co)
//! - `PAYSTACK_TIMEOUT_SECS` - Gateway call timeout (default: 20)
//! - `PAYSTACK_CALLBACK_URL` - Checkout return URL (optional)
//! - `STORE_CURRENCY` - ISO 4217 code (default: NGN)
//! - `WEBHOOK_IP_ALLOWLIST` - Comma-separated webhook source addresses
//! - `JWT_SECRET` - HS256 key for customer tokens (required)

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use eshop_core::{MinuteStampGenerator, OrderNumberGenerator};
use eshop_db::Database;
use eshop_payments::{
    Checkout, LogNotifier, PaymentGateway, PaystackClient, ReconciliationEngine, WebhookVerifier,
};

// Re-exports
pub use auth::{Customer, JwtVerifier};
pub use config::{AppConfig, ConfigError};
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub checkout: Checkout,
    pub engine: ReconciliationEngine,
    pub jwt: Arc<JwtVerifier>,
    pub order_numbers: Arc<dyn OrderNumberGenerator>,
}

impl AppState {
    /// Wires the services around an explicit gateway.
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        config: &AppConfig,
    ) -> Self {
        AppState {
            checkout: Checkout::new(db.clone(), gateway.clone(), &config.store_currency),
            engine: ReconciliationEngine::new(
                db.clone(),
                gateway,
                WebhookVerifier::new(config.webhook_config()),
                Arc::new(LogNotifier),
            ),
            db,
            jwt: Arc::new(JwtVerifier::new(&config.jwt_secret)),
            order_numbers: Arc::new(MinuteStampGenerator),
        }
    }

    /// Production wiring: Paystack gateway from configuration.
    pub fn from_config(db: Database, config: &AppConfig) -> anyhow::Result<Self> {
        let gateway = PaystackClient::new(config.gateway_config())?;
        Ok(AppState::new(db, Arc::new(gateway), config))
    }
}

/// Builds the application router with request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::orders::router())
        .merge(routes::payments::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
