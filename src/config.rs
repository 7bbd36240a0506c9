//! Configuration management for powchain

use crate::blockchain::DEFAULT_MINING_REWARD;
use crate::error::{ChainError, Result};
use crate::miner::{ProofOfWork, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::transaction::Transaction;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File read by [`load_config`] from the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_reward")]
    pub reward: f64,
    /// Reward recipient. A random node identifier is generated when unset.
    #[serde(default)]
    pub miner_address: Option<String>,
    /// Give up on a proof search after this many milliseconds. Unset means
    /// the search always runs to completion.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
            miner_address: None,
            timeout_ms: None,
        }
    }
}

impl MiningConfig {
    pub fn proof_of_work(&self) -> Result<ProofOfWork> {
        ProofOfWork::new(self.difficulty)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Reject values the ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(ChainError::InvalidConfig("server.host must be set".to_string()));
        }

        if self.server.port == 0 {
            return Err(ChainError::InvalidConfig("server.port must be non-zero".to_string()));
        }

        if self.mining.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidConfig(format!(
                "mining.difficulty must be at most {}",
                MAX_DIFFICULTY
            )));
        }

        if !self.mining.reward.is_finite() || self.mining.reward <= 0.0 {
            return Err(ChainError::InvalidConfig(
                "mining.reward must be a positive number".to_string(),
            ));
        }

        if let Some(address) = &self.mining.miner_address {
            if address.trim().is_empty() {
                return Err(ChainError::InvalidConfig(
                    "mining.miner_address cannot be empty".to_string(),
                ));
            }
            if address.len() > Transaction::MAX_IDENTIFIER_LENGTH {
                return Err(ChainError::InvalidConfig(format!(
                    "mining.miner_address exceeds maximum length of {} characters",
                    Transaction::MAX_IDENTIFIER_LENGTH
                )));
            }
        }

        if self.mining.timeout_ms == Some(0) {
            return Err(ChainError::InvalidConfig(
                "mining.timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply a `PORT` value. Unparseable values are ignored.
    pub fn apply_port_override(&mut self, port: Option<&str>) {
        if let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// Apply overrides taken from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_port_override(std::env::var("PORT").ok().as_deref());
    }
}

/// Load `config.toml` from the working directory, falling back to defaults
/// when it is absent. The `PORT` environment variable overrides the port.
pub fn load_config() -> Result<Config> {
    let mut config = if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config_from(DEFAULT_CONFIG_PATH)?
    } else {
        Config::default()
    };

    config.apply_env_overrides();

    config.validate()?;
    Ok(config)
}

/// Load and validate a configuration file. Environment overrides are not
/// applied; call [`Config::apply_env_overrides`] for that.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_reward() -> f64 {
    DEFAULT_MINING_REWARD
}
