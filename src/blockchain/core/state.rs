use crate::blockchain::core::chain::Block;
use crate::error::ChainError;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The authoritative ledger: spendable balances and locked stakes.
///
/// `State` carries no lock of its own; it is owned by [`Blockchain`] and
/// mutated only under the chain's write lock. Commits clone the state,
/// apply on the clone, and swap it in, so a failed apply never leaves a
/// partial write behind.
///
/// [`Blockchain`]: crate::blockchain::Blockchain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub balances: HashMap<String, u64>,
    pub stakes: HashMap<String, u64>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spendable balance of an address; absent addresses read as zero.
    pub fn balance(&self, address: &str) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Locked stake of an address; absent addresses read as zero.
    pub fn stake(&self, address: &str) -> u64 {
        self.stakes.get(address).copied().unwrap_or(0)
    }

    pub fn set_balance(&mut self, address: &str, amount: u64) {
        self.balances.insert(address.to_string(), amount);
    }

    pub fn add_balance(&mut self, address: &str, amount: u64) {
        *self.balances.entry(address.to_string()).or_insert(0) += amount;
    }

    pub fn sub_balance(&mut self, address: &str, amount: u64) -> Result<(), ChainError> {
        let balance = self.balance(address);
        if balance < amount {
            return Err(ChainError::InsufficientBalance {
                balance,
                required: amount,
            });
        }
        self.balances.insert(address.to_string(), balance - amount);
        Ok(())
    }

    /// Moves `amount` from spendable balance into locked stake.
    pub fn add_stake(&mut self, address: &str, amount: u64) -> Result<(), ChainError> {
        let balance = self.balance(address);
        if balance < amount {
            return Err(ChainError::InsufficientBalance {
                balance,
                required: amount,
            });
        }
        self.balances.insert(address.to_string(), balance - amount);
        *self.stakes.entry(address.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// Moves `amount` from locked stake back into spendable balance.
    pub fn remove_stake(&mut self, address: &str, amount: u64) -> Result<(), ChainError> {
        let stake = self.stake(address);
        if stake < amount {
            return Err(ChainError::InsufficientStake {
                stake,
                requested: amount,
            });
        }
        self.stakes.insert(address.to_string(), stake - amount);
        *self.balances.entry(address.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// Applies one transaction. Signatures are NOT checked here; callers
    /// must have verified the transaction already.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<(), ChainError> {
        if tx.is_coinbase() {
            self.add_balance(&tx.to, tx.amount);
            return Ok(());
        }

        let required = tx.amount.saturating_add(tx.fee);
        let balance = self.balance(&tx.from);
        if balance < required {
            return Err(ChainError::InsufficientBalance { balance, required });
        }

        self.balances.insert(tx.from.clone(), balance - required);
        self.add_balance(&tx.to, tx.amount);
        Ok(())
    }

    /// Applies every transaction of a block in order, then credits the
    /// block's total fees to its validator. On failure the state is left
    /// partially applied; callers apply on a clone and discard it.
    pub fn apply_block(&mut self, block: &Block) -> Result<(), ChainError> {
        for tx in &block.transactions {
            self.apply_transaction(tx).map_err(|e| {
                ChainError::InvalidBlock(format!("failed to apply transaction {}: {}", tx.id, e))
            })?;
        }

        let fees = block.total_fees();
        if fees > 0 {
            self.add_balance(&block.validator, fees);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_addresses_read_zero() {
        let state = State::new();
        assert_eq!(state.balance("nobody"), 0);
        assert_eq!(state.stake("nobody"), 0);
    }

    #[test]
    fn test_balance_arithmetic() {
        let mut state = State::new();
        state.set_balance("alice", 100);
        state.add_balance("alice", 50);
        assert_eq!(state.balance("alice"), 150);

        state.sub_balance("alice", 150).unwrap();
        assert_eq!(state.balance("alice"), 0);

        let err = state.sub_balance("alice", 1).unwrap_err();
        assert_eq!(
            err,
            ChainError::InsufficientBalance {
                balance: 0,
                required: 1
            }
        );
    }

    #[test]
    fn test_stake_moves_funds_atomically() {
        let mut state = State::new();
        state.set_balance("alice", 2_000);

        state.add_stake("alice", 1_500).unwrap();
        assert_eq!(state.balance("alice"), 500);
        assert_eq!(state.stake("alice"), 1_500);

        state.remove_stake("alice", 500).unwrap();
        assert_eq!(state.balance("alice"), 1_000);
        assert_eq!(state.stake("alice"), 1_000);
    }

    #[test]
    fn test_overdrawn_stake_leaves_maps_untouched() {
        let mut state = State::new();
        state.set_balance("alice", 100);

        let err = state.add_stake("alice", 101).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
        assert_eq!(state.balance("alice"), 100);
        assert_eq!(state.stake("alice"), 0);

        let err = state.remove_stake("alice", 1).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientStake { .. }));
        assert_eq!(state.balance("alice"), 100);
        assert_eq!(state.stake("alice"), 0);
    }

    #[test]
    fn test_apply_coinbase_credits_recipient() {
        let mut state = State::new();
        let tx = Transaction::coinbase("alice", 50);
        state.apply_transaction(&tx).unwrap();
        assert_eq!(state.balance("alice"), 50);
    }

    #[test]
    fn test_apply_transfer_debits_amount_plus_fee() {
        let mut state = State::new();
        state.set_balance("alice", 200);

        let tx = Transaction::new("alice", "bob", 100, 1);
        state.apply_transaction(&tx).unwrap();

        assert_eq!(state.balance("alice"), 99);
        assert_eq!(state.balance("bob"), 100);
    }

    #[test]
    fn test_apply_transfer_refuses_overdraw() {
        let mut state = State::new();
        state.set_balance("alice", 100);

        let tx = Transaction::new("alice", "bob", 100, 1);
        let err = state.apply_transaction(&tx).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
        assert_eq!(state.balance("alice"), 100);
        assert_eq!(state.balance("bob"), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut state = State::new();
        state.set_balance("alice", 100);
        state.add_stake("alice", 40).unwrap();

        let mut copy = state.clone();
        copy.set_balance("alice", 0);
        copy.remove_stake("alice", 40).unwrap();
        copy.set_balance("bob", 7);

        assert_eq!(state.balance("alice"), 60);
        assert_eq!(state.stake("alice"), 40);
        assert_eq!(state.balance("bob"), 0);
    }
}
