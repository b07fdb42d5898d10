//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! development defaults. The two secrets have no default.

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use eshop_core::DEFAULT_CURRENCY;
use eshop_db::DbConfig;
use eshop_payments::config::{DEFAULT_BASE_URL, PAYSTACK_WEBHOOK_IPS};
use eshop_payments::{GatewayConfig, WebhookConfig};

/// API configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub database_max_connections: u32,

    /// Paystack secret key (API bearer token and webhook HMAC key)
    pub paystack_secret_key: String,

    /// Paystack API root
    pub paystack_base_url: String,

    /// Gateway call timeout
    pub paystack_timeout: Duration,

    /// Where the checkout page sends the customer back to
    pub paystack_callback_url: Option<String>,

    /// ISO 4217 code orders are charged in
    pub store_currency: String,

    /// Addresses allowed to deliver webhooks
    pub webhook_ip_allowlist: Vec<IpAddr>,

    /// HS256 key for customer bearer tokens
    pub jwt_secret: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of
    /// a variable when it is set.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired(key.to_string()))
        };

        let config = AppConfig {
            http_port: var("HTTP_PORT", "8000")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: PathBuf::from(var("DATABASE_PATH", "./eshop.db")),

            database_max_connections: var("DATABASE_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()))?,

            paystack_secret_key: required("PAYSTACK_SECRET_KEY")?,

            paystack_base_url: var("PAYSTACK_BASE_URL", DEFAULT_BASE_URL),

            paystack_timeout: var("PAYSTACK_TIMEOUT_SECS", "20")
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue("PAYSTACK_TIMEOUT_SECS".to_string()))?,

            paystack_callback_url: lookup("PAYSTACK_CALLBACK_URL").filter(|v| !v.trim().is_empty()),

            store_currency: var("STORE_CURRENCY", DEFAULT_CURRENCY),

            webhook_ip_allowlist: match lookup("WEBHOOK_IP_ALLOWLIST") {
                Some(list) => parse_ip_list(&list)?,
                None => parse_ip_list(&PAYSTACK_WEBHOOK_IPS.join(","))?,
            },

            jwt_secret: required("JWT_SECRET")?,
        };

        if config.store_currency.len() != 3
            || !config.store_currency.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(ConfigError::InvalidValue("STORE_CURRENCY".to_string()));
        }
        if config.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.database_max_connections)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(&self.paystack_secret_key)
            .base_url(&self.paystack_base_url)
            .timeout(self.paystack_timeout)
            .callback_url(self.paystack_callback_url.clone())
    }

    /// Paystack signs webhooks with the account's secret key.
    pub fn webhook_config(&self) -> WebhookConfig {
        WebhookConfig::new(&self.paystack_secret_key).allowed_ips(self.webhook_ip_allowlist.clone())
    }
}

fn parse_ip_list(list: &str) -> Result<Vec<IpAddr>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            ip.parse()
                .map_err(|_| ConfigError::InvalidValue("WEBHOOK_IP_ALLOWLIST".to_string()))
        })
        .collect()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
