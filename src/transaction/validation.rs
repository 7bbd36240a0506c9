/// Validation logic for transactions separated from type definitions
use crate::error::{ChainError, Result};
use crate::transaction::types::Transaction;

impl Transaction {
    /// Stateless well-formedness check.
    ///
    /// Applied on construction and again to every transaction of an
    /// externally supplied chain, since deserialization bypasses `new`.
    pub fn validate(&self) -> Result<()> {
        validate_identifier("sender", &self.sender)?;
        validate_identifier("recipient", &self.recipient)?;

        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ChainError::InvalidTransaction(
                "Amount must be a positive number".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_identifier(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ChainError::InvalidTransaction(format!(
            "{} cannot be empty",
            field
        )));
    }

    if value.len() > Transaction::MAX_IDENTIFIER_LENGTH {
        return Err(ChainError::InvalidTransaction(format!(
            "{} exceeds maximum length of {} characters",
            field,
            Transaction::MAX_IDENTIFIER_LENGTH
        )));
    }

    Ok(())
}
