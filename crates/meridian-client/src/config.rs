//! Configuration management for the meridian client

use meridian_types::{BroadcastMode, Coins};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("io error:: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml parsing error:: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("toml serialization error:: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A value failed validation
    #[error("invalid configuration:: {0}")]
    Invalid(String),
}

/// Client configuration
///
/// Missing keys in a config file take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Node RPC endpoint
    pub node: String,
    /// Chain ID
    pub chain_id: String,
    /// Default fee, e.g. "4stake"; empty means no fee
    pub fee: String,
    /// Default gas limit
    pub gas: u64,
    /// Default broadcast mode
    pub mode: BroadcastMode,
    /// Bound on every node call, in seconds
    pub timeout_secs: u64,
    /// Number of entries in the shared account/params cache
    pub cache_capacity: usize,
    /// Age after which a cached entry is refreshed, in seconds
    pub cache_expiry_secs: u64,
    /// Number of signer lock shards
    pub lock_shards: usize,
    /// Maximum messages per transaction
    pub max_msgs_per_tx: usize,
    /// Attempts per sub-batch on stale sequence rejections
    pub sequence_retry_limit: u32,
    /// Modules whose `tx_size_limit` parameter is enforced
    pub size_limited_modules: Vec<String>,
    /// Log filter directive
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node: "http://localhost:26657".to_string(),
            chain_id: "meridian-chain".to_string(),
            fee: String::new(),
            gas: 20_000,
            mode: BroadcastMode::Sync,
            timeout_secs: 5,
            cache_capacity: 100,
            cache_expiry_secs: 60,
            lock_shards: 16,
            max_msgs_per_tx: 10,
            sequence_retry_limit: 3,
            size_limited_modules: vec!["service".to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            home.join(".meridian")
        } else {
            PathBuf::from(".meridian")
        }
    }

    /// Get default configuration file path
    pub fn default_config_file() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_file();

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("invalid value for {key}:: {value}")))
        }

        match key {
            "node" => self.node = value.to_string(),
            "chain_id" => self.chain_id = value.to_string(),
            "fee" => {
                value
                    .parse::<Coins>()
                    .map_err(|e| ConfigError::Invalid(format!("invalid fee:: {e}")))?;
                self.fee = value.to_string();
            }
            "gas" => self.gas = parse(key, value)?,
            "mode" => {
                self.mode = value.parse().map_err(ConfigError::Invalid)?;
            }
            "timeout_secs" => self.timeout_secs = parse(key, value)?,
            "cache_capacity" => self.cache_capacity = parse(key, value)?,
            "cache_expiry_secs" => self.cache_expiry_secs = parse(key, value)?,
            "lock_shards" => self.lock_shards = parse(key, value)?,
            "max_msgs_per_tx" => self.max_msgs_per_tx = parse(key, value)?,
            "sequence_retry_limit" => self.sequence_retry_limit = parse(key, value)?,
            "size_limited_modules" => {
                self.size_limited_modules = value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect();
            }
            "log_level" => self.log_level = value.to_string(),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "unknown configuration key:: {key}"
                )));
            }
        }
        Ok(())
    }

    /// Check that the configuration can drive a client
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.trim().is_empty() {
            return Err(ConfigError::Invalid("node must not be empty".to_string()));
        }
        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::Invalid("chain_id must not be empty".to_string()));
        }
        self.default_fee()?;
        for (name, value) in [
            ("timeout_secs", self.timeout_secs as usize),
            ("cache_capacity", self.cache_capacity),
            ("lock_shards", self.lock_shards),
            ("max_msgs_per_tx", self.max_msgs_per_tx),
            ("sequence_retry_limit", self.sequence_retry_limit as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Parsed default fee
    pub fn default_fee(&self) -> Result<Coins, ConfigError> {
        self.fee
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid fee:: {e}")))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cache_expiry_secs)
    }
}
