use crate::blockchain::core::state::State;
use crate::crypto;
use crate::economics::BLOCK_REWARD;
use crate::error::ChainError;
use crate::transaction::Transaction;
use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Literal `prev_hash` of the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";
/// Literal validator and signature of the genesis block.
pub const GENESIS_VALIDATOR: &str = "genesis";

/// A block in the chain. The first transaction is always the coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub prev_hash: String,
    pub hash: String,
    pub validator: String,
    pub signature: String,
}

impl Block {
    /// Creates an unsigned block stamped with the current time.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        prev_hash: &str,
        validator: &str,
    ) -> Self {
        let mut block = Block {
            index,
            timestamp: Utc::now().timestamp(),
            transactions,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            validator: validator.to_string(),
            signature: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Derives the block hash: SHA-256 over the ASCII concatenation of
    /// index, timestamp, prev_hash, validator and every transaction id in
    /// order, hex-encoded. Transaction bodies are covered only through
    /// their ids; each body is authenticated by its own signature.
    pub fn calculate_hash(&self) -> String {
        let mut data = format!(
            "{}{}{}{}",
            self.index, self.timestamp, self.prev_hash, self.validator
        );
        for tx in &self.transactions {
            data.push_str(&tx.id);
        }
        crypto::hash_hex(data.as_bytes())
    }

    /// Signs the block hash with the validator's private key.
    pub fn sign(&mut self, private_key: &SigningKey) {
        let signature = private_key.sign(self.hash.as_bytes());
        self.signature = crypto::signature_to_hex(&signature.to_bytes());
    }

    /// Verifies block integrity and the producer signature against the
    /// supplied public key, then every non-coinbase child transaction.
    pub fn verify(&self, public_key: &VerifyingKey) -> Result<(), ChainError> {
        if self.hash != self.calculate_hash() {
            return Err(ChainError::InvalidBlock("block hash mismatch".to_string()));
        }

        if self.signature.is_empty() {
            return Err(ChainError::InvalidSignature("block not signed".to_string()));
        }

        let signature = crypto::signature_from_hex(&self.signature)?;
        if !crypto::verify(public_key, self.hash.as_bytes(), &signature) {
            return Err(ChainError::InvalidSignature(
                "block signature does not verify".to_string(),
            ));
        }

        for tx in &self.transactions {
            if !tx.is_coinbase() {
                tx.verify().map_err(|e| {
                    ChainError::InvalidBlock(format!("invalid transaction {}: {}", tx.id, e))
                })?;
            }
        }

        Ok(())
    }

    pub fn transaction_by_id(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    /// Sum of fees over the non-coinbase transactions.
    pub fn total_fees(&self) -> u64 {
        self.transactions
            .iter()
            .filter(|tx| !tx.is_coinbase())
            .map(|tx| tx.fee)
            .sum()
    }

    /// Binary encoding for peer exchange.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ChainError> {
        Ok(bincode::deserialize(data)?)
    }
}

/// The ordered chain of blocks, the pending-transaction mempool and the
/// ledger state, all guarded by one logical lock (the `RwLock` the node
/// wraps this struct in).
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub pending: Vec<Transaction>,
    pub state: State,
    pub genesis_address: String,
    tx_pool: HashMap<String, Transaction>,
}

impl Blockchain {
    /// Creates a chain with a genesis block allocating `initial_supply`
    /// to `genesis_address`.
    pub fn new(genesis_address: &str, initial_supply: u64) -> Self {
        let genesis = Self::create_genesis_block(genesis_address, initial_supply);

        let mut blockchain = Blockchain {
            blocks: Vec::new(),
            pending: Vec::new(),
            state: State::new(),
            genesis_address: genesis_address.to_string(),
            tx_pool: HashMap::new(),
        };

        // Genesis is applied directly; it predates any validator set.
        blockchain
            .state
            .apply_block(&genesis)
            .expect("genesis coinbase cannot overdraw");
        blockchain.blocks.push(genesis);
        blockchain
    }

    fn create_genesis_block(address: &str, initial_supply: u64) -> Block {
        let coinbase = Transaction::coinbase(address, initial_supply);

        let mut genesis = Block {
            index: 0,
            timestamp: 0,
            transactions: vec![coinbase],
            prev_hash: GENESIS_PREV_HASH.to_string(),
            hash: String::new(),
            validator: GENESIS_VALIDATOR.to_string(),
            signature: GENESIS_VALIDATOR.to_string(),
        };
        genesis.hash = genesis.calculate_hash();
        genesis
    }

    /// The last block in the chain. The chain always holds at least the
    /// genesis block.
    pub fn latest_block(&self) -> &Block {
        self.blocks.last().expect("chain always has genesis")
    }

    /// Admits a transaction into the mempool.
    ///
    /// The balance check runs against committed state only; pending debits
    /// from the same sender are not reserved. A sender can therefore queue
    /// transactions that collectively overdraw until block time, at which
    /// point `add_block` rejects the block's excess spend.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        // Coinbase transactions carry no signature and fail here; they
        // exist only inside locally produced blocks.
        tx.verify()?;

        if self.tx_pool.contains_key(&tx.id) {
            return Err(ChainError::DuplicateTransaction(tx.id));
        }

        let required = tx.amount.saturating_add(tx.fee);
        let balance = self.state.balance(&tx.from);
        if balance < required {
            return Err(ChainError::InsufficientBalance { balance, required });
        }

        self.tx_pool.insert(tx.id.clone(), tx.clone());
        self.pending.push(tx);
        Ok(())
    }

    /// Builds the next block from the mempool: the coinbase paying the
    /// block reward first, then the pending transactions in submission
    /// order. The block is returned unsigned; the caller signs it.
    pub fn create_block(&self, validator: &str) -> Block {
        let latest = self.latest_block();

        let coinbase = Transaction::coinbase(validator, BLOCK_REWARD);
        let mut transactions = vec![coinbase];
        transactions.extend(self.pending.iter().cloned());

        Block::new(latest.index + 1, transactions, &latest.hash, validator)
    }

    /// Validates and commits a block.
    ///
    /// The state transition runs on a clone; only when the whole block
    /// applies is the clone swapped in, the block appended, and the
    /// mempool cleared. On any failure nothing is observable.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainError> {
        self.validate_incoming(&block)?;

        let mut next_state = self.state.clone();
        next_state.apply_block(&block)?;

        for tx in &block.transactions {
            self.tx_pool.remove(&tx.id);
        }
        self.pending.clear();
        self.state = next_state;
        self.blocks.push(block);
        Ok(())
    }

    pub fn block_by_index(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == hash)
    }

    /// Looks a transaction up in committed blocks first, then the mempool.
    pub fn transaction_by_id(&self, id: &str) -> Option<&Transaction> {
        self.blocks
            .iter()
            .find_map(|b| b.transaction_by_id(id))
            .or_else(|| self.tx_pool.get(id))
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn contains_pending(&self, id: &str) -> bool {
        self.tx_pool.contains_key(id)
    }

    /// Number of blocks including genesis.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Structural audit of the whole chain: indices, linkage and hashes.
    pub fn is_valid(&self) -> bool {
        for i in 1..self.blocks.len() {
            let current = &self.blocks[i];
            let prev = &self.blocks[i - 1];

            if current.hash != current.calculate_hash() {
                return false;
            }
            if current.prev_hash != prev.hash {
                return false;
            }
            if current.index != prev.index + 1 {
                return false;
            }
        }
        true
    }
}
