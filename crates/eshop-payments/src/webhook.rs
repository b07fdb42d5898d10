//! # Webhook Authenticity
//!
//! Checks run on every gateway callback before its body is looked at.
//!
//! ```text
//! source IP ∈ allow-list ?  ── no ──► Forbidden (403)
//!        │ yes
//!        ▼
//! hex(HMAC-SHA512(secret, raw body)) == x-paystack-signature ?
//!        │                              ── no ──► BadSignature (400)
//!        ▼ yes
//! parse body
//! ```
//!
//! The digest comparison is constant-time (`Mac::verify_slice`).

use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::net::IpAddr;
use tracing::warn;

use crate::config::WebhookConfig;
use crate::error::WebhookRejection;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Verifies source address and body signature of webhook calls.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    config: WebhookConfig,
}

impl WebhookVerifier {
    pub fn new(config: WebhookConfig) -> Self {
        WebhookVerifier { config }
    }

    /// Runs both checks, address first.
    pub fn verify(
        &self,
        source: IpAddr,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), WebhookRejection> {
        self.check_source(source)?;
        self.check_signature(source, signature, body)
    }

    fn check_source(&self, source: IpAddr) -> Result<(), WebhookRejection> {
        if self.config.allows(source) {
            Ok(())
        } else {
            warn!(source = %source, "Webhook from address outside the allow-list");
            Err(WebhookRejection::Forbidden)
        }
    }

    fn check_signature(
        &self,
        source: IpAddr,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), WebhookRejection> {
        let Some(signature) = signature else {
            warn!(source = %source, "Webhook without signature header");
            return Err(WebhookRejection::BadSignature);
        };

        let expected = hex::decode(signature.trim()).map_err(|_| {
            warn!(source = %source, "Webhook signature is not hex");
            WebhookRejection::BadSignature
        })?;

        let mut mac = HmacSha512::new_from_slice(self.config.secret.as_bytes())
            .map_err(|_| WebhookRejection::BadSignature)?;
        mac.update(body);

        mac.verify_slice(&expected).map_err(|_| {
            warn!(source = %source, "Webhook signature mismatch");
            WebhookRejection::BadSignature
        })
    }
}

/// Hex HMAC-SHA512 of `body`, as the gateway computes it.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

// =============================================================================
// Unit Tests
// =============================================================================
