//! # Payment Configuration
//!
//! Typed settings injected into the gateway client and the webhook verifier
//! at construction time. Loading them from the environment is the
//! application's job.

use std::net::IpAddr;
use std::time::Duration;

/// Production Paystack API root.
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Gateway call budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Addresses Paystack sends webhooks from.
pub const PAYSTACK_WEBHOOK_IPS: &[&str] = &["52.31.139.75", "52.49.173.169", "52.214.14.220"];

// =============================================================================
// Gateway
// =============================================================================

/// Settings for [`PaystackClient`](crate::gateway::PaystackClient).
#[derive(Clone)]
pub struct GatewayConfig {
    /// Secret API key, sent as a bearer token.
    pub secret_key: String,

    /// API root, without trailing slash.
    /// Default: https://api.paystack.co
    pub base_url: String,

    /// Per-request timeout.
    /// Default: 20 seconds
    pub timeout: Duration,

    /// Where the checkout page returns the customer. The gateway dashboard
    /// setting applies when unset.
    pub callback_url: Option<String>,
}

impl GatewayConfig {
    /// Creates a configuration for the production API.
    pub fn new(secret_key: impl Into<String>) -> Self {
        GatewayConfig {
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            callback_url: None,
        }
    }

    /// Sets the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the checkout callback URL.
    pub fn callback_url(mut self, url: Option<String>) -> Self {
        self.callback_url = url;
        self
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

// =============================================================================
// Webhook
// =============================================================================

/// Settings for [`WebhookVerifier`](crate::webhook::WebhookVerifier).
#[derive(Clone)]
pub struct WebhookConfig {
    /// HMAC-SHA512 key. Paystack signs with the account's secret key.
    pub secret: String,

    /// Source addresses accepted for webhook calls.
    pub allowed_ips: Vec<IpAddr>,
}

impl WebhookConfig {
    /// Creates a configuration with Paystack's published webhook addresses.
    pub fn new(secret: impl Into<String>) -> Self {
        WebhookConfig {
            secret: secret.into(),
            allowed_ips: PAYSTACK_WEBHOOK_IPS
                .iter()
                .filter_map(|ip| ip.parse().ok())
                .collect(),
        }
    }

    /// Replaces the allow-list.
    pub fn allowed_ips(mut self, ips: Vec<IpAddr>) -> Self {
        self.allowed_ips = ips;
        self
    }

    /// Whether `ip` may deliver webhooks. IPv4-mapped IPv6 addresses are
    /// compared as IPv4.
    pub fn allows(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.allowed_ips.iter().any(|allowed| allowed.to_canonical() == ip)
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &"<redacted>")
            .field("allowed_ips", &self.allowed_ips)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
