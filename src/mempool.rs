//! Pool of transactions waiting for the next mined block

use crate::error::{ChainError, Result};
use crate::transaction::Transaction;

/// Pending transactions in arrival order
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction. Malformed entries are rejected so the pool
    /// never holds one, whatever path produced the value.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<()> {
        tx.validate()?;
        self.transactions.push(tx);
        Ok(())
    }

    /// Hand off every pending transaction, leaving the pool empty.
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    /// Hand off the `n` oldest transactions. Later arrivals stay pending.
    pub fn drain_front(&mut self, n: usize) -> Vec<Transaction> {
        let n = n.min(self.transactions.len());
        self.transactions.drain(..n).collect()
    }

    pub fn get_all_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
