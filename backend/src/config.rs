//! Configuration management for the injera back-office
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INJERA__ prefix

use std::collections::HashMap;
use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{DefaultThresholds, StockCategory};

use crate::error::{AppError, AppResult};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Bootstrap account configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Outbound notification configuration
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Inventory policy configuration
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL, or `memory://` for the in-process store
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

/// Admin account created at startup when the users table is empty
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    pub bootstrap_admin_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// E-mail relay webhook; notifications are only logged when unset
    pub webhook_url: Option<String>,

    /// HMAC key for the `X-Injera-Signature` header
    pub signing_secret: Option<String>,

    /// Address the relay should deliver staff notifications to
    pub recipient: Option<String>,

    /// How long a request waits on one delivery before giving up
    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_notification_timeout_ms() -> u64 {
    5000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            signing_secret: None,
            recipient: None,
            timeout_ms: default_notification_timeout_ms(),
        }
    }
}

impl NotificationConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InventoryConfig {
    /// Per-category overrides of the built-in default thresholds
    #[serde(default)]
    pub default_thresholds: HashMap<String, i32>,
}

impl InventoryConfig {
    /// Built-in defaults with configured overrides applied
    pub fn default_thresholds(&self) -> AppResult<DefaultThresholds> {
        let mut thresholds = DefaultThresholds::default();
        for (category, threshold) in &self.default_thresholds {
            let category: StockCategory = category
                .parse()
                .map_err(|e| AppError::Configuration(format!("inventory.default_thresholds: {}", e)))?;
            thresholds = thresholds.with(category, *threshold);
        }
        Ok(thresholds)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("INJERA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "postgres://localhost/injera")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 86400)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INJERA__ prefix)
            .add_source(
                Environment::with_prefix("INJERA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration for tests and local experiments
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 1,
                min_connections: 0,
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                access_token_expiry: 3600,
            },
            auth: AuthConfig::default(),
            notification: NotificationConfig::default(),
            inventory: InventoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
