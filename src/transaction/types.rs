/// Transaction types for powchain
use crate::error::{ChainError, Result};

/// Sender used for system-issued mining rewards
pub const REWARD_SENDER: &str = "0";

/// A value transfer between two identifiers, recorded in a block
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl Transaction {
    /// Maximum identifier length (256 characters)
    pub const MAX_IDENTIFIER_LENGTH: usize = 256;

    /// Build a transaction, rejecting malformed input.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<Self> {
        let tx = Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        };
        tx.validate()?;
        Ok(tx)
    }

    /// Reward transaction crediting `miner` for a freshly mined block
    pub fn reward(miner: impl Into<String>, amount: f64) -> Result<Self> {
        Self::new(REWARD_SENDER, miner, amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }
}
