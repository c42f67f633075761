//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL URL; in-memory store when unset
/// - `ORDERS_SERVICE_URL` — Orders service base URL
/// - `ORDERS_SERVICE_TIMEOUT_MS` — notifier request timeout (default: 10000)
/// - `SETTLEMENT_DELAY_MS` — simulated bank delay (default: 2000)
/// - `SETTLEMENT_APPROVAL_RATE` — approval probability (default: 0.90)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub orders_base_url: String,
    pub orders_timeout: Duration,
    pub settlement_delay: Duration,
    pub approval_rate: f64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            orders_base_url: std::env::var("ORDERS_SERVICE_URL")
                .unwrap_or_else(|_| "http://orders-service:8080".to_string()),
            orders_timeout: Duration::from_millis(
                std::env::var("ORDERS_SERVICE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            settlement_delay: Duration::from_millis(
                std::env::var("SETTLEMENT_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2_000),
            ),
            approval_rate: std::env::var("SETTLEMENT_APPROVAL_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.90),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            orders_base_url: "http://orders-service:8080".to_string(),
            orders_timeout: Duration::from_secs(10),
            settlement_delay: Duration::from_secs(2),
            approval_rate: 0.90,
        }
    }
}
