//! # eshop-payments: Gateway Conversations for eshop
//!
//! Everything that talks to, or hears from, the payment gateway.
//!
//! ## Module Organization
//! ```text
//! eshop_payments/
//! ├── checkout     - Order placement + payment start, compensating release
//! ├── config       - Gateway and webhook settings (secrets redacted in Debug)
//! ├── error        - GatewayError, ReconcileError, WebhookRejection
//! ├── gateway      - PaymentGateway trait, Paystack client (reqwest)
//! ├── notify       - Settlement hook
//! ├── reconcile    - Verify (pull) and webhook (push) paths
//! └── webhook      - IP allow-list + HMAC-SHA512 signature check
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let gateway = Arc::new(PaystackClient::new(GatewayConfig::new(secret))?);
//! let checkout = Checkout::new(db.clone(), gateway.clone(), "NGN");
//! let engine = ReconciliationEngine::new(
//!     db,
//!     gateway,
//!     WebhookVerifier::new(WebhookConfig::new(secret)),
//!     Arc::new(LogNotifier),
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod reconcile;
pub mod webhook;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{Checkout, Placement};
pub use config::{GatewayConfig, WebhookConfig};
pub use error::{GatewayError, ReconcileError, WebhookRejection};
pub use gateway::{PaymentGateway, PaystackClient};
pub use notify::{LogNotifier, PaymentNotifier};
pub use reconcile::{ReconciliationEngine, VerifiedPayment, WebhookOutcome};
pub use webhook::{sign, WebhookVerifier, SIGNATURE_HEADER};

// =============================================================================
// Test Support
// =============================================================================
