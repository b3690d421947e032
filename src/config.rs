//! Configuration module for Nimbus.

use serde::Deserialize;
use std::path::Path;

use crate::{NimbusError, Result};

/// Minimum number of random bytes in a public share token.
pub const MIN_TOKEN_BYTES: usize = 16;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/nimbus.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the blob storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

fn default_storage_path() -> String {
    "data/files".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
        }
    }
}

/// Credential configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

fn default_token_expiry() -> u64 {
    3600 // 1 hour
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_secs: default_token_expiry(),
        }
    }
}

/// Sharing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SharingConfig {
    /// Random bytes per public share token.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
    /// Insert attempts before giving up on a colliding token.
    #[serde(default = "default_max_token_attempts")]
    pub max_token_attempts: u32,
    /// Interval for the expired-grant sweeper in seconds (0 = disabled).
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

fn default_token_bytes() -> usize {
    32
}

fn default_max_token_attempts() -> u32 {
    5
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            token_bytes: default_token_bytes(),
            max_token_attempts: default_max_token_attempts(),
            sweep_interval_secs: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/nimbus.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Credential configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Sharing configuration.
    #[serde(default)]
    pub sharing: SharingConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(NimbusError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NimbusError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `NIMBUS_JWT_SECRET`: Override the JWT secret key
    /// - `NIMBUS_DATABASE_PATH`: Override the database file path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("NIMBUS_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
        if let Ok(path) = std::env::var("NIMBUS_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - JWT secret is not set
    /// - Share tokens would carry fewer than 16 random bytes
    /// - No token attempt is allowed
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(NimbusError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via NIMBUS_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.sharing.token_bytes < MIN_TOKEN_BYTES {
            return Err(NimbusError::Config(format!(
                "sharing.token_bytes must be at least {MIN_TOKEN_BYTES}"
            )));
        }
        if self.sharing.max_token_attempts == 0 {
            return Err(NimbusError::Config(
                "sharing.max_token_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
