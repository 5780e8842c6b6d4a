// Thin re-export module: implementation is in `blockchain/core.rs` to allow
// progressive decomposition of blockchain responsibilities (validation,
// chain management, state transitions).

pub mod core;
pub use core::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::economics::BLOCK_REWARD;
    use crate::error::ChainError;
    use crate::transaction::Transaction;

    fn funded_chain(keypair: &KeyPair, supply: u64) -> Blockchain {
        Blockchain::new(&keypair.address(), supply)
    }

    fn signed_transfer(from: &KeyPair, to: &str, amount: u64, fee: u64) -> Transaction {
        let mut tx = Transaction::new(&from.address(), to, amount, fee);
        tx.sign(from);
        tx
    }

    #[test]
    fn test_genesis_shape() {
        let chain = Blockchain::new("alice", 1_000_000);

        assert_eq!(chain.height(), 1);
        assert_eq!(chain.state.balance("alice"), 1_000_000);

        let genesis = &chain.blocks[0];
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.timestamp, 0);
        assert_eq!(genesis.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(genesis.validator, GENESIS_VALIDATOR);
        assert_eq!(genesis.signature, GENESIS_VALIDATOR);
        assert_eq!(genesis.hash, genesis.calculate_hash());
        assert_eq!(genesis.transactions.len(), 1);
        assert!(genesis.transactions[0].is_coinbase());
        assert!(chain.is_valid());
    }

    #[test]
    fn test_add_transaction_admits_valid() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000);

        let tx = signed_transfer(&alice, "bob", 100, 1);
        chain.add_transaction(tx.clone()).unwrap();

        assert_eq!(chain.pending_transactions().len(), 1);
        assert!(chain.contains_pending(&tx.id));
    }

    #[test]
    fn test_add_transaction_rejects_duplicate() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000);

        let tx = signed_transfer(&alice, "bob", 100, 1);
        chain.add_transaction(tx.clone()).unwrap();

        let err = chain.add_transaction(tx).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTransaction(_)));
        assert_eq!(chain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_add_transaction_rejects_overdraw() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 100);

        let tx = signed_transfer(&alice, "bob", 100, 1);
        let err = chain.add_transaction(tx).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
        assert!(chain.pending_transactions().is_empty());
    }

    #[test]
    fn test_add_transaction_rejects_coinbase() {
        let mut chain = Blockchain::new("alice", 1_000);
        let err = chain
            .add_transaction(Transaction::coinbase("bob", 50))
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidSignature(_)));
    }

    #[test]
    fn test_create_block_with_empty_mempool_has_only_coinbase() {
        let alice = KeyPair::generate().unwrap();
        let chain = funded_chain(&alice, 1_000);

        let block = chain.create_block(&alice.address());
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_coinbase());
        assert_eq!(block.transactions[0].amount, BLOCK_REWARD);
        assert_eq!(block.index, 1);
        assert_eq!(block.prev_hash, chain.latest_block().hash);
        assert!(block.signature.is_empty());
    }

    #[test]
    fn test_simple_transfer_end_to_end() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000_000);

        let tx = signed_transfer(&alice, "bob", 100, 1);
        chain.add_transaction(tx).unwrap();
        assert_eq!(chain.pending_transactions().len(), 1);

        let mut block = chain.create_block(&alice.address());
        block.sign(&alice.private_key);
        chain.add_block(block).unwrap();

        // -101 for the transfer, +50 coinbase, +1 fee credit.
        assert_eq!(chain.state.balance(&alice.address()), 999_950);
        assert_eq!(chain.state.balance("bob"), 100);
        assert_eq!(chain.height(), 2);
        assert!(chain.pending_transactions().is_empty());
        assert!(chain.is_valid());
    }

    #[test]
    fn test_add_block_rejects_bad_prev_hash() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000);

        let mut block = chain.create_block(&alice.address());
        block.prev_hash = "deadbeef".to_string();
        block.hash = block.calculate_hash();
        block.sign(&alice.private_key);

        let err = chain.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn test_add_block_rejects_tampered_hash() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000);

        let mut block = chain.create_block(&alice.address());
        block.hash = "00".repeat(32);

        let err = chain.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn test_failed_commit_leaves_chain_unchanged() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000);

        // Forge a block whose body overdraws the sender: structurally sound
        // and fully signed, so only the state transition can reject it.
        let mut overdraw = Transaction::new(&alice.address(), "bob", 5_000, 1);
        overdraw.sign(&alice);

        let coinbase = Transaction::coinbase(&alice.address(), BLOCK_REWARD);
        let latest_hash = chain.latest_block().hash.clone();
        let mut block = Block::new(1, vec![coinbase, overdraw], &latest_hash, &alice.address());
        block.sign(&alice.private_key);

        let balance_before = chain.state.balance(&alice.address());
        let err = chain.add_block(block).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.state.balance(&alice.address()), balance_before);
    }

    #[test]
    fn test_transaction_lookup_in_blocks_and_pool() {
        let alice = KeyPair::generate().unwrap();
        let mut chain = funded_chain(&alice, 1_000_000);

        let committed = signed_transfer(&alice, "bob", 100, 1);
        chain.add_transaction(committed.clone()).unwrap();
        let mut block = chain.create_block(&alice.address());
        block.sign(&alice.private_key);
        chain.add_block(block).unwrap();

        let pending = signed_transfer(&alice, "carol", 5, 1);
        chain.add_transaction(pending.clone()).unwrap();

        assert_eq!(chain.transaction_by_id(&committed.id).unwrap().to, "bob");
        assert_eq!(chain.transaction_by_id(&pending.id).unwrap().to, "carol");
        assert!(chain.transaction_by_id("missing").is_none());
    }

    #[test]
    fn test_block_lookups() {
        let chain = Blockchain::new("alice", 1_000);
        let genesis_hash = chain.blocks[0].hash.clone();

        assert_eq!(chain.block_by_index(0).unwrap().index, 0);
        assert!(chain.block_by_index(5).is_none());
        assert_eq!(chain.block_by_hash(&genesis_hash).unwrap().index, 0);
        assert!(chain.block_by_hash("missing").is_none());
    }

    #[test]
    fn test_block_signature_covers_hash() {
        let alice = KeyPair::generate().unwrap();
        let chain = funded_chain(&alice, 1_000);

        let mut block = chain.create_block(&alice.address());
        block.sign(&alice.private_key);
        assert!(block.verify(&alice.public_key).is_ok());

        // Any header change invalidates the hash, and with it the signature.
        let mut tampered = block.clone();
        tampered.timestamp += 1;
        assert!(tampered.verify(&alice.public_key).is_err());

        tampered = block;
        tampered.validator = "mallory".to_string();
        assert!(tampered.verify(&alice.public_key).is_err());
    }
}
