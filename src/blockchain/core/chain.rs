use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::miner::ProofOfWork;
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 100;
/// `previous_hash` of the genesis block: a digest of all zeros
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
/// 2023-01-01T00:00:00Z, fixed so every ledger derives the same genesis hash
pub const GENESIS_TIMESTAMP: f64 = 1672531200.0;
/// Amount credited to the miner of each block
pub const DEFAULT_MINING_REWARD: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

/// Hashing view of a transaction. Keys are declared in lexicographic order.
#[derive(serde::Serialize)]
struct CanonicalTransaction<'a> {
    amount: f64,
    recipient: &'a str,
    sender: &'a str,
}

/// Hashing view of a block. Keys are declared in lexicographic order.
#[derive(serde::Serialize)]
struct CanonicalBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof: u64,
    timestamp: f64,
    transactions: Vec<CanonicalTransaction<'a>>,
}

impl Block {
    /// Canonical pre-image of [`Block::hash`]: compact JSON with keys sorted
    /// at every level.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = CanonicalBlock {
            index: self.index,
            previous_hash: &self.previous_hash,
            proof: self.proof,
            timestamp: self.timestamp,
            transactions: self
                .transactions
                .iter()
                .map(|tx| CanonicalTransaction {
                    amount: tx.amount,
                    recipient: &tx.recipient,
                    sender: &tx.sender,
                })
                .collect(),
        };
        // Serializing these borrowed views into a Vec cannot fail.
        serde_json::to_vec(&canonical).unwrap_or_default()
    }

    /// Lowercase hex SHA-256 of the canonical encoding
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

/// Snapshot of the tip taken before a proof search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningJob {
    pub tip_index: u64,
    pub last_proof: u64,
    /// Pool length at snapshot time. Only these entries go into the block.
    pub pending: usize,
}

#[derive(Debug, Clone)]
pub struct Blockchain {
    pub(crate) blocks: Vec<Block>,
    pub(crate) mempool: Mempool,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Create a ledger holding only the genesis block.
    pub fn new() -> Self {
        let mut blockchain = Blockchain {
            blocks: Vec::new(),
            mempool: Mempool::new(),
        };
        blockchain.blocks.push(Self::create_genesis_block());
        blockchain
    }

    fn create_genesis_block() -> Block {
        Block {
            index: 1,
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Queue a transaction for the next block.
    ///
    /// Returns the index of the block expected to include it. This is only an
    /// echo for the caller: a concurrent mine may seal the pool first.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<u64> {
        let tx = Transaction::new(sender, recipient, amount)?;
        self.mempool.add_transaction(tx)?;
        Ok(self.last_block().index + 1)
    }

    pub fn last_block(&self) -> &Block {
        // `blocks` always holds at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Seal the pending pool into a new block and append it.
    ///
    /// The caller is responsible for `proof` being valid against the tip's
    /// proof; it is not re-checked here.
    pub fn new_block(&mut self, proof: u64, previous_hash: String) -> &Block {
        let transactions = self.mempool.drain();
        self.append_block(proof, previous_hash, transactions)
    }

    fn append_block(
        &mut self,
        proof: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
    ) -> &Block {
        let last = self.last_block();
        let block = Block {
            index: last.index + 1,
            timestamp: now_seconds().max(last.timestamp),
            transactions,
            proof,
            previous_hash,
        };

        self.blocks.push(block);
        self.last_block()
    }

    /// Capture the tip for a proof search. Fails when there is nothing to mine.
    pub fn mining_job(&self) -> Result<MiningJob> {
        if self.mempool.is_empty() {
            return Err(ChainError::NothingToMine);
        }
        let last = self.last_block();
        Ok(MiningJob {
            tip_index: last.index,
            last_proof: last.proof,
            pending: self.mempool.len(),
        })
    }

    /// Finish a mining job: add the reward, link to the tip and append.
    ///
    /// The block holds the transactions that were pending when the job was
    /// taken, followed by the reward. Anything submitted during the proof
    /// search stays in the pool for the next block.
    pub fn seal(
        &mut self,
        job: MiningJob,
        proof: u64,
        miner: &str,
        reward: f64,
    ) -> Result<&Block> {
        if job.pending == 0 || self.mempool.is_empty() {
            return Err(ChainError::NothingToMine);
        }
        if self.last_block().index != job.tip_index {
            return Err(ChainError::StaleJob);
        }

        let reward = Transaction::reward(miner, reward)?;
        let mut transactions = self.mempool.drain_front(job.pending);
        transactions.push(reward);
        let previous_hash = self.last_block().hash();
        Ok(self.append_block(proof, previous_hash, transactions))
    }

    /// Mine one block in place: job, proof search, seal.
    pub fn mine(
        &mut self,
        pow: &ProofOfWork,
        miner: &str,
        reward: f64,
    ) -> Result<&Block> {
        let job = self.mining_job()?;
        let proof = pow.find_proof(job.last_proof);
        self.seal(job, proof, miner, reward)
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the genesis block is present from construction.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by its 1-based index.
    pub fn block(&self, index: u64) -> Result<&Block> {
        index
            .checked_sub(1)
            .and_then(|i| self.blocks.get(i as usize))
            .ok_or(ChainError::BlockNotFound(index))
    }

    pub fn pending(&self) -> &[Transaction] {
        self.mempool.get_all_transactions()
    }
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::is_chain_valid;

    fn pow() -> ProofOfWork {
        ProofOfWork::new(2).unwrap()
    }

    #[test]
    fn test_genesis_present_after_construction() {
        let chain = Blockchain::new();
        assert_eq!(chain.len(), 1);
        let genesis = chain.last_block();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.is_genesis());
    }

    #[test]
    fn test_genesis_hash_is_shared_across_ledgers() {
        assert_eq!(
            Blockchain::new().last_block().hash(),
            Blockchain::new().last_block().hash()
        );
    }

    #[test]
    fn test_canonical_bytes_sorted_and_compact() {
        let block = Block {
            index: 2,
            timestamp: 1.5,
            transactions: vec![Transaction::new("a", "b", 10.0).unwrap()],
            proof: 7,
            previous_hash: "ab".to_string(),
        };
        let encoded = String::from_utf8(block.canonical_bytes()).unwrap();
        assert_eq!(
            encoded,
            r#"{"index":2,"previous_hash":"ab","proof":7,"timestamp":1.5,"transactions":[{"amount":10.0,"recipient":"b","sender":"a"}]}"#
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = Blockchain::new().last_block().clone();
        let copy: Block = serde_json::from_value(serde_json::json!({
            "previous_hash": block.previous_hash,
            "proof": block.proof,
            "transactions": [],
            "timestamp": block.timestamp,
            "index": block.index,
        }))
        .unwrap();

        assert_eq!(block.hash(), block.hash());
        assert_eq!(block.hash(), copy.hash());
        assert_eq!(block.hash().len(), 64);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let block = Blockchain::new().last_block().clone();
        let mut other = block.clone();
        other.proof += 1;
        assert_ne!(block.hash(), other.hash());
    }

    #[test]
    fn test_new_transaction_returns_next_index() {
        let mut chain = Blockchain::new();
        let index = chain.new_transaction("a", "b", 10.0).unwrap();
        assert_eq!(index, chain.last_block().index + 1);
        assert_eq!(chain.pending().len(), 1);
    }

    #[test]
    fn test_invalid_transaction_leaves_pool_unchanged() {
        let mut chain = Blockchain::new();
        assert!(chain.new_transaction("a", "b", -3.0).is_err());
        assert!(chain.pending().is_empty());
    }

    #[test]
    fn test_mine_with_empty_pool_rejected() {
        let mut chain = Blockchain::new();
        assert_eq!(
            chain.mine(&pow(), "miner", DEFAULT_MINING_REWARD).unwrap_err(),
            ChainError::NothingToMine
        );
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_mine_scenario() {
        let mut chain = Blockchain::new();
        let pow = pow();
        let genesis_hash = chain.last_block().hash();

        chain.new_transaction("A", "B", 10.0).unwrap();
        chain.new_transaction("B", "C", 5.0).unwrap();
        let block = chain.mine(&pow, "miner", DEFAULT_MINING_REWARD).unwrap().clone();

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(
            block.transactions,
            vec![
                Transaction::new("A", "B", 10.0).unwrap(),
                Transaction::new("B", "C", 5.0).unwrap(),
                Transaction::reward("miner", DEFAULT_MINING_REWARD).unwrap(),
            ]
        );
        assert!(pow.valid_proof(GENESIS_PROOF, block.proof));
        assert!(chain.pending().is_empty());
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_mined_chain_is_valid() {
        let mut chain = Blockchain::new();
        let pow = pow();
        for round in 0..3 {
            chain.new_transaction("a", "b", (round + 1) as f64).unwrap();
            chain.mine(&pow, "miner", DEFAULT_MINING_REWARD).unwrap();
        }

        assert_eq!(chain.len(), 4);
        for pair in chain.chain().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash());
            assert!(pow.valid_proof(pair[0].proof, pair[1].proof));
            assert!(pair[1].timestamp >= pair[0].timestamp);
        }
        assert!(is_chain_valid(chain.chain(), &pow));
    }

    #[test]
    fn test_seal_rejects_stale_job() {
        let mut chain = Blockchain::new();
        let pow = pow();
        chain.new_transaction("a", "b", 1.0).unwrap();
        let job = chain.mining_job().unwrap();
        let proof = pow.find_proof(job.last_proof);

        chain.mine(&pow, "other", DEFAULT_MINING_REWARD).unwrap();
        chain.new_transaction("c", "d", 1.0).unwrap();

        assert_eq!(
            chain.seal(job, proof, "miner", DEFAULT_MINING_REWARD).unwrap_err(),
            ChainError::StaleJob
        );
        assert_eq!(chain.pending().len(), 1);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_seal_leaves_late_transactions_pending() {
        let mut chain = Blockchain::new();
        let pow = pow();
        chain.new_transaction("a", "b", 1.0).unwrap();
        let job = chain.mining_job().unwrap();
        assert_eq!(job.pending, 1);
        let proof = pow.find_proof(job.last_proof);
        // Arrives during the proof search; echoes the block being mined.
        assert_eq!(chain.new_transaction("late", "b", 2.0).unwrap(), 2);

        let block = chain.seal(job, proof, "miner", DEFAULT_MINING_REWARD).unwrap().clone();
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].sender, "a");
        assert!(block.transactions[1].is_reward());

        assert_eq!(chain.pending().len(), 1);
        assert_eq!(chain.pending()[0].sender, "late");

        let next = chain.mine(&pow, "miner", DEFAULT_MINING_REWARD).unwrap();
        assert_eq!(next.index, 3);
        assert_eq!(next.transactions[0].sender, "late");
        assert!(chain.pending().is_empty());
    }

    #[test]
    fn test_block_lookup_is_one_based() {
        let chain = Blockchain::new();
        assert_eq!(chain.block(1).unwrap().index, 1);
        assert_eq!(chain.block(0).unwrap_err(), ChainError::BlockNotFound(0));
        assert_eq!(chain.block(2).unwrap_err(), ChainError::BlockNotFound(2));
    }
}
