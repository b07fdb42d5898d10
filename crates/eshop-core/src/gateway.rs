//! # Gateway Wire Types
//!
//! Payloads exchanged with the payment gateway (Paystack transaction API)
//! and the webhook events it pushes back.
//!
//! ## Flow
//! ```text
//! ┌───────────┐  POST /transaction/initialize   ┌──────────────┐
//! │           │ ──── InitializeRequest ───────► │              │
//! │           │ ◄─── Envelope<InitializeData> ─ │              │
//! │  eshop    │                                 │   Gateway    │
//! │           │  GET /transaction/verify/{ref}  │              │
//! │           │ ◄─── Envelope<TransactionData>  │              │
//! │           │                                 │              │
//! │           │ ◄─── POST webhook (RawEvent) ── │              │
//! └───────────┘                                 └──────────────┘
//! ```
//!
//! Amounts on the wire are minor units, the same integers stored locally.

use serde::{Deserialize, Serialize};

/// Gateway value of `data.status` for a settled charge.
pub const STATUS_SUCCESS: &str = "success";

/// Webhook event name for a settled charge.
pub const EVENT_CHARGE_SUCCESS: &str = "charge.success";

// =============================================================================
// Outbound
// =============================================================================

/// Metadata attached to a transaction so the gateway dashboard links back
/// to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub order_id: String,
    pub order_number: String,
}

/// Body of `POST /transaction/initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub email: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub metadata: PaymentMetadata,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub callback_url: Option<String>,
}

// =============================================================================
// Inbound
// =============================================================================

/// Common response wrapper: `{ status, message, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// `data` of a successful initialize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeData {
    /// Checkout page the customer is redirected to.
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// `data` of a verify call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionData {
    /// `success`, `failed`, `abandoned`, `ongoing`, ...
    pub status: String,
    pub reference: String,
    /// Minor units.
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub gateway_response: Option<String>,
}

impl TransactionData {
    /// Whether the gateway reports the charge as settled.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

// =============================================================================
// Webhook Events
// =============================================================================

/// A webhook body as received, before dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Known webhook events.
///
/// Anything not listed is acknowledged without a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// `charge.success`. `reference` is `None` when the payload omits it.
    ChargeSuccess { reference: Option<String> },
    /// Any other event name.
    Unhandled(String),
}

impl From<RawEvent> for WebhookEvent {
    fn from(raw: RawEvent) -> Self {
        match raw.event.as_str() {
            EVENT_CHARGE_SUCCESS => WebhookEvent::ChargeSuccess {
                reference: raw
                    .data
                    .get("reference")
                    .and_then(|r| r.as_str())
                    .filter(|r| !r.is_empty())
                    .map(str::to_string),
            },
            _ => WebhookEvent::Unhandled(raw.event),
        }
    }
}

impl WebhookEvent {
    /// Parses a webhook body. Fails only when the JSON itself is invalid
    /// or has no `event` field.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<RawEvent>(body).map(WebhookEvent::from)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
