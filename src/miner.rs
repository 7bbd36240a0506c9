//! Proof-of-work engine.
//!
//! A proof is valid for a previous proof when the SHA-256 digest of the two
//! numbers written in decimal and concatenated (`"{last_proof}{proof}"`)
//! starts with `difficulty` zero hex characters. The search walks candidates
//! upward from zero, so it is deterministic and repeatable.
//!
//! The search is unbounded. With no cancellation flag raised it only returns
//! once a proof is found, so a high difficulty can keep a caller busy for an
//! arbitrarily long time. [`ProofOfWork::find_proof_cancellable`] is the hook
//! for callers that need a deadline.

use crate::error::{ChainError, Result};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

/// Leading zero hex characters required by default
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// A SHA-256 digest has 64 hex characters
pub const MAX_DIFFICULTY: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Result<Self> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidConfig(format!(
                "difficulty {} exceeds maximum {}",
                difficulty, MAX_DIFFICULTY
            )));
        }
        Ok(Self { difficulty })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Check a candidate proof against the previous block's proof.
    pub fn valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        let digest = proof_digest(last_proof, proof);
        leading_zero_nibbles(&digest) >= self.difficulty
    }

    /// Search for the smallest proof satisfying [`Self::valid_proof`].
    pub fn find_proof(&self, last_proof: u64) -> u64 {
        let mut proof: u64 = 0;
        while !self.valid_proof(last_proof, proof) {
            proof = proof.wrapping_add(1);
        }
        proof
    }

    /// Same search as [`Self::find_proof`], giving up once `cancel` is set.
    pub fn find_proof_cancellable(
        &self,
        last_proof: u64,
        cancel: &AtomicBool,
    ) -> Result<u64> {
        let mut proof: u64 = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!(last_proof, tried = proof, "proof search cancelled");
                return Err(ChainError::MiningCancelled);
            }
            if self.valid_proof(last_proof, proof) {
                return Ok(proof);
            }
            proof = proof.wrapping_add(1);
        }
    }
}

/// Digest hashed by the proof-of-work predicate
pub fn proof_digest(last_proof: u64, proof: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}{}", last_proof, proof).as_bytes());
    hasher.finalize().into()
}

/// Number of leading `'0'` characters in the hex encoding of `hash`.
fn leading_zero_nibbles(hash: &[u8; 32]) -> u32 {
    let mut count = 0;
    for byte in hash {
        if *byte == 0 {
            count += 2;
            continue;
        }
        if byte >> 4 == 0 {
            count += 1;
        }
        break;
    }
    count
}
