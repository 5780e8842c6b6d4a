//! Structural validation of incoming blocks
//!
//! These are the checks `add_block` repeats regardless of what consensus
//! already verified, so that committing stays safe when called in
//! isolation. Consensus-level rules (validator identity, stake, timestamp
//! window, producer signature) live in [`crate::consensus`].

use crate::blockchain::core::chain::{Block, Blockchain};
use crate::error::ChainError;

impl Blockchain {
    pub(crate) fn validate_incoming(&self, block: &Block) -> Result<(), ChainError> {
        let latest = self.latest_block();

        if block.index != latest.index + 1 {
            return Err(ChainError::InvalidBlock(format!(
                "invalid block index: expected {}, got {}",
                latest.index + 1,
                block.index
            )));
        }

        if block.prev_hash != latest.hash {
            return Err(ChainError::InvalidBlock(format!(
                "invalid previous hash: expected {}, got {}",
                latest.hash, block.prev_hash
            )));
        }

        if block.hash != block.calculate_hash() {
            return Err(ChainError::InvalidBlock("block hash mismatch".to_string()));
        }

        for tx in &block.transactions {
            if !tx.is_coinbase() {
                tx.verify().map_err(|e| {
                    ChainError::InvalidBlock(format!("invalid transaction {}: {}", tx.id, e))
                })?;
            }
        }

        Ok(())
    }
}
