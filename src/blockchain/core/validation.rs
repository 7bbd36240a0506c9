use crate::blockchain::core::chain::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;

/// Verify an entire chain: genesis shape, then linkage, ordering and
/// proof-of-work for every adjacent pair.
///
/// A single bad block rejects the whole chain; no valid prefix is kept.
pub fn validate_chain(chain: &[Block], pow: &ProofOfWork) -> Result<()> {
    let genesis = chain
        .first()
        .ok_or_else(|| ChainError::InvalidChain("Chain is empty".to_string()))?;

    if genesis.index != 1 {
        return Err(ChainError::InvalidChain(format!(
            "Genesis block must have index 1, but got {}.",
            genesis.index
        )));
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::InvalidChain(format!(
            "Genesis previous hash must be {}, but got {}.",
            GENESIS_PREVIOUS_HASH, genesis.previous_hash
        )));
    }
    validate_transactions(genesis)?;

    for pair in chain.windows(2) {
        let (prev, block) = (&pair[0], &pair[1]);

        if block.index != prev.index + 1 {
            return Err(ChainError::InvalidChain(format!(
                "Invalid block index. Expected {}, but got {}.",
                prev.index + 1,
                block.index
            )));
        }

        let expected_hash = prev.hash();
        if block.previous_hash != expected_hash {
            return Err(ChainError::InvalidChain(format!(
                "Invalid previous block hash at block {}. Expected {}, but got {}.",
                block.index, expected_hash, block.previous_hash
            )));
        }

        if !pow.valid_proof(prev.proof, block.proof) {
            return Err(ChainError::InvalidChain(format!(
                "Invalid proof of work at block {}.",
                block.index
            )));
        }

        if block.timestamp < prev.timestamp {
            return Err(ChainError::InvalidChain(format!(
                "Block {} timestamp goes backwards.",
                block.index
            )));
        }

        validate_transactions(block)?;
    }

    Ok(())
}

pub fn is_chain_valid(chain: &[Block], pow: &ProofOfWork) -> bool {
    validate_chain(chain, pow).is_ok()
}

fn validate_transactions(block: &Block) -> Result<()> {
    for tx in &block.transactions {
        tx.validate().map_err(|e| {
            ChainError::InvalidChain(format!("Block {} holds a malformed transaction: {}", block.index, e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Blockchain, DEFAULT_MINING_REWARD};

    fn mined_chain(pow: &ProofOfWork, blocks: usize) -> Vec<Block> {
        let mut chain = Blockchain::new();
        for i in 0..blocks {
            chain.new_transaction("alice", "bob", (i + 1) as f64).unwrap();
            chain.mine(pow, "miner", DEFAULT_MINING_REWARD).unwrap();
        }
        chain.chain().to_vec()
    }

    #[test]
    fn test_fresh_chain_is_valid() {
        let pow = ProofOfWork::new(2).unwrap();
        assert!(is_chain_valid(Blockchain::new().chain(), &pow));
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        let pow = ProofOfWork::new(2).unwrap();
        assert!(!is_chain_valid(&[], &pow));
    }

    #[test]
    fn test_tampered_transaction_breaks_linkage() {
        let pow = ProofOfWork::new(2).unwrap();
        let mut chain = mined_chain(&pow, 3);
        chain[1].transactions[0].amount = 1_000.0;

        let err = validate_chain(&chain, &pow).unwrap_err();
        assert!(matches!(err, ChainError::InvalidChain(msg) if msg.contains("previous block hash")));
    }

    #[test]
    fn test_bad_proof_rejected() {
        let pow = ProofOfWork::new(2).unwrap();
        let mut chain = mined_chain(&pow, 1);
        let mut proof = chain[1].proof + 1;
        while pow.valid_proof(chain[0].proof, proof) {
            proof += 1;
        }
        chain[1].proof = proof;

        assert!(!is_chain_valid(&chain, &pow));
    }

    #[test]
    fn test_index_gap_rejected() {
        let pow = ProofOfWork::new(2).unwrap();
        let mut chain = mined_chain(&pow, 2);
        chain.remove(1);
        assert!(!is_chain_valid(&chain, &pow));
    }

    #[test]
    fn test_bad_genesis_rejected() {
        let pow = ProofOfWork::new(2).unwrap();
        let mut chain = mined_chain(&pow, 1);
        chain[0].previous_hash = "1".to_string();
        assert!(!is_chain_valid(&chain, &pow));
    }

    #[test]
    fn test_malformed_transaction_rejected() {
        let pow = ProofOfWork::new(0).unwrap();
        let mut chain = mined_chain(&pow, 1);
        let last = chain.len() - 1;
        chain[last].transactions[0].amount = -3.0;
        assert!(!is_chain_valid(&chain, &pow));
    }

    #[test]
    fn test_harder_validator_rejects_easier_chain() {
        let easy = ProofOfWork::new(1).unwrap();
        let hard = ProofOfWork::new(8).unwrap();
        let chain = mined_chain(&easy, 2);
        assert!(is_chain_valid(&chain, &easy));
        assert!(!is_chain_valid(&chain, &hard));
    }
}
