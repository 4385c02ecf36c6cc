//! Configuration for the cart engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cart engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Conference code the catalog is fetched for
    pub conference: String,
    /// Language the catalog is fetched in
    pub language: String,
    /// Path of the durable cart document
    pub storage_path: PathBuf,
    /// Timeout for gateway-bound operations (voucher check, submission)
    pub gateway_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every knob has a default, so an empty environment works.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            conference: env::var("CONFERENCE_CODE").unwrap_or_else(|_| "pycon-demo".to_string()),
            language: env::var("CONFERENCE_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            storage_path: env::var("CART_STORAGE_PATH")
                .map_or_else(|_| PathBuf::from("ticketshop-cart.json"), PathBuf::from),
            gateway_timeout: Duration::from_secs(
                env::var("GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conference: "pycon-demo".to_string(),
            language: "en".to_string(),
            storage_path: PathBuf::from("ticketshop-cart.json"),
            gateway_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
        }
    }
}
