//! Error types for powchain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("No transactions to mine!")]
    NothingToMine,
    #[error("Chain tip moved while the proof was being searched")]
    StaleJob,
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
    #[error("Block {0} not found")]
    BlockNotFound(u64),
    #[error("Mining cancelled")]
    MiningCancelled,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Config parse error: {0}")]
    ConfigParse(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigParse(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
