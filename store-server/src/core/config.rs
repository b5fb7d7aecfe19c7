//! Server configuration
//!
//! All values load from environment variables with sensible defaults:
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/storefront | Working directory (database, logs) |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | TAX_PERCENT | 15 | Tax percentage on the discounted items price |
//! | SHIPPING_FLAT | 50 | Flat shipping charge |
//! | FREE_SHIPPING_THRESHOLD | 1000 | Items price at which shipping is free |
//! | NOTIFY_WEBHOOK_URL | (unset) | Lifecycle event webhook; log-only if unset |
//! | SHUTDOWN_TIMEOUT_MS | 10000 | Graceful shutdown window |

use std::path::PathBuf;

use crate::auth::JwtConfig;
use crate::engine::PricingConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// JWT validation configuration
    pub jwt: JwtConfig,
    /// Tax percentage applied at checkout
    pub tax_percent: f64,
    /// Flat shipping charge
    pub shipping_flat: f64,
    /// Items price at or above which shipping is free
    pub free_shipping_threshold: Option<f64>,
    /// Webhook endpoint for lifecycle events
    pub notify_webhook_url: Option<String>,
    /// Graceful shutdown window in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/storefront".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt: JwtConfig::default(),
            tax_percent: std::env::var("TAX_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15.0),
            shipping_flat: std::env::var("SHIPPING_FLAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50.0),
            free_shipping_threshold: std::env::var("FREE_SHIPPING_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(Some(1000.0)),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
        }
    }

    /// Pricing policy derived from this configuration
    pub fn pricing(&self) -> PricingConfig {
        PricingConfig {
            tax_percent: self.tax_percent,
            shipping_flat: self.shipping_flat,
            free_shipping_threshold: self.free_shipping_threshold,
        }
    }

    /// Database directory under the working directory
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// Log directory under the working directory
    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Create the working directory layout if missing
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
