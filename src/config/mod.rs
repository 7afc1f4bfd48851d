//! Configuration management for keygate
//!
//! Supports loading configuration from:
//! - Environment variables (KEYGATE_*)
//! - Config file (config.toml)

use crate::errors::{KeyGateError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Key inventory configuration
    pub keystore: KeystoreConfig,

    /// Policy configuration
    pub policy: PolicyConfig,

    /// Approval workflow configuration
    pub approval: ApprovalConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            keystore: KeystoreConfig::default(),
            policy: PolicyConfig::default(),
            approval: ApprovalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: String,

    /// Port number
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 8400,
        }
    }
}

/// Key inventory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreConfig {
    /// Directory holding one key file per identity
    pub key_dir: PathBuf,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("./data/keys"),
        }
    }
}

/// Policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Path to the identity policy document
    pub rules_path: PathBuf,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("./config/policies.json"),
        }
    }
}

/// Approval workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Where workflow state persists; unset keeps it in memory only
    pub state_path: Option<PathBuf>,

    /// How long a grant stays valid, in seconds (0 = never expires)
    pub grant_ttl_seconds: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            state_path: Some(PathBuf::from("./data/authorizations.json")),
            grant_ttl_seconds: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Start with defaults
        builder = builder.add_source(config::Config::try_from(&Config::default()).unwrap());

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        } else {
            // Try default locations
            builder = builder
                .add_source(config::File::with_name("config").required(false))
                .add_source(config::File::with_name("/etc/keygate/config").required(false));
        }

        // Load from environment (KEYGATE_SERVER__PORT, etc.)
        builder = builder.add_source(
            config::Environment::with_prefix("KEYGATE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| KeyGateError::ConfigError(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| KeyGateError::ConfigError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.is_empty() {
            return Err(KeyGateError::ConfigError(
                "server.listen_addr must not be empty".to_string(),
            ));
        }

        if !self.policy.rules_path.exists() {
            return Err(KeyGateError::ConfigError(format!(
                "policy file does not exist: {:?}",
                self.policy.rules_path
            )));
        }

        Ok(())
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }
}
