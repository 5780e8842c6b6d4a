//! Proof-of-stake consensus: the validator registry, deterministic
//! stake-weighted producer selection, and per-block validation rules.

use crate::blockchain::Block;
use crate::crypto::{self, KeyPair};
use crate::economics::BLOCK_REWARD;
use crate::error::ChainError;
use chrono::Utc;
use ed25519_dalek::{SigningKey, VerifyingKey};
use num_bigint::BigUint;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A registered block producer. The private key is present only for the
/// local node's own validator; peers are known by address, public key and
/// stake.
#[derive(Clone, Debug)]
pub struct Validator {
    pub address: String,
    pub public_key: VerifyingKey,
    pub private_key: Option<SigningKey>,
    pub stake: u64,
}

impl Validator {
    pub fn new(address: &str, public_key: VerifyingKey, stake: u64) -> Self {
        Validator {
            address: address.to_string(),
            public_key,
            private_key: None,
            stake,
        }
    }

    /// Builds the local node's validator, keeping the signing key.
    pub fn from_keypair(keypair: &KeyPair, stake: u64) -> Self {
        Validator {
            address: keypair.address(),
            public_key: keypair.public_key,
            private_key: Some(keypair.private_key.clone()),
            stake,
        }
    }

    pub fn can_validate(&self, min_stake: u64) -> bool {
        self.stake >= min_stake
    }

    pub fn info(&self, total_stake: u64) -> ValidatorInfo {
        let weight = if total_stake > 0 {
            self.stake as f64 / total_stake as f64
        } else {
            0.0
        };
        ValidatorInfo {
            address: self.address.clone(),
            public_key: crypto::public_key_to_hex(&self.public_key),
            stake: self.stake,
            weight,
        }
    }
}

/// Public validator information as exposed on the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub address: String,
    pub public_key: String,
    pub stake: u64,
    pub weight: f64,
}

/// The set of registered validators, keyed by address.
#[derive(Default)]
pub struct ValidatorSet {
    validators: HashMap<String, Validator>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, validator: Validator) -> Result<(), ChainError> {
        if self.validators.contains_key(&validator.address) {
            return Err(ChainError::ValidatorExists(validator.address));
        }
        self.validators.insert(validator.address.clone(), validator);
        Ok(())
    }

    pub fn remove(&mut self, address: &str) -> Result<(), ChainError> {
        self.validators
            .remove(address)
            .map(|_| ())
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))
    }

    pub fn get(&self, address: &str) -> Result<&Validator, ChainError> {
        self.validators
            .get(address)
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))
    }

    pub fn update_stake(&mut self, address: &str, stake: u64) -> Result<(), ChainError> {
        let validator = self
            .validators
            .get_mut(address)
            .ok_or_else(|| ChainError::UnknownValidator(address.to_string()))?;
        validator.stake = stake;
        Ok(())
    }

    pub fn total_stake(&self) -> u64 {
        self.validators.values().map(|v| v.stake).sum()
    }

    /// All validators sorted by address ascending. Hash-map order would
    /// make producer selection irreproducible across nodes, so every
    /// enumeration here is address-sorted.
    pub fn sorted(&self) -> Vec<Validator> {
        let mut validators: Vec<Validator> = self.validators.values().cloned().collect();
        validators.sort_by(|a, b| a.address.cmp(&b.address));
        validators
    }

    pub fn infos(&self) -> Vec<ValidatorInfo> {
        let total_stake = self.total_stake();
        self.sorted().iter().map(|v| v.info(total_stake)).collect()
    }

    pub fn size(&self) -> usize {
        self.validators.len()
    }
}

/// The proof-of-stake engine.
pub struct PoS {
    pub min_stake: u64,
    pub block_time: Duration,
    validators: RwLock<ValidatorSet>,
}

impl PoS {
    pub fn new(min_stake: u64, block_time: Duration) -> Self {
        PoS {
            min_stake,
            block_time,
            validators: RwLock::new(ValidatorSet::new()),
        }
    }

    pub fn register_validator(&self, validator: Validator) -> Result<(), ChainError> {
        if validator.stake < self.min_stake {
            return Err(ChainError::StakeBelowMinimum {
                stake: validator.stake,
                min_stake: self.min_stake,
            });
        }
        self.validators.write().add(validator)
    }

    pub fn unregister_validator(&self, address: &str) -> Result<(), ChainError> {
        self.validators.write().remove(address)
    }

    pub fn update_validator_stake(&self, address: &str, stake: u64) -> Result<(), ChainError> {
        self.validators.write().update_stake(address, stake)
    }

    pub fn validator(&self, address: &str) -> Result<Validator, ChainError> {
        self.validators.read().get(address).map(|v| v.clone())
    }

    pub fn validator_infos(&self) -> Vec<ValidatorInfo> {
        self.validators.read().infos()
    }

    pub fn total_stake(&self) -> u64 {
        self.validators.read().total_stake()
    }

    pub fn validator_count(&self) -> usize {
        self.validators.read().size()
    }

    /// Selects the producer for the slot `(prev_hash, timestamp)`.
    ///
    /// Selection is a pure function of its arguments and the current
    /// validator set: the seed is SHA-256 over the previous block hash and
    /// the big-endian timestamp, reduced modulo total stake, and walked
    /// over the eligible validators in address order until the cumulative
    /// stake passes the target.
    pub fn select_validator(
        &self,
        prev_hash: &str,
        timestamp: i64,
    ) -> Result<Validator, ChainError> {
        let eligible: Vec<Validator> = self
            .validators
            .read()
            .sorted()
            .into_iter()
            .filter(|v| v.can_validate(self.min_stake))
            .collect();

        if eligible.is_empty() {
            return Err(ChainError::NoEligibleValidators);
        }

        let total_stake: u64 = eligible.iter().map(|v| v.stake).sum();
        let seed = Self::generate_seed(prev_hash, timestamp);
        let target = seed % BigUint::from(total_stake);

        let mut cumulative = 0u64;
        for validator in &eligible {
            cumulative += validator.stake;
            if target < BigUint::from(cumulative) {
                return Ok(validator.clone());
            }
        }

        // target < total_stake == final cumulative, so the walk returns
        // inside the loop; fall back to the last validator regardless.
        Ok(eligible[eligible.len() - 1].clone())
    }

    fn generate_seed(prev_hash: &str, timestamp: i64) -> BigUint {
        let mut data = prev_hash.as_bytes().to_vec();
        data.extend_from_slice(&(timestamp as u64).to_be_bytes());
        BigUint::from_bytes_be(&crypto::hash(&data))
    }

    /// Validates a block against consensus rules: known validator with
    /// sufficient stake, valid producer signature, and a timestamp that is
    /// neither ahead of our clock by more than a block interval nor behind
    /// its predecessor.
    pub fn validate_block(&self, block: &Block, prev: Option<&Block>) -> Result<(), ChainError> {
        let validator = self.validator(&block.validator)?;

        if !validator.can_validate(self.min_stake) {
            return Err(ChainError::StakeBelowMinimum {
                stake: validator.stake,
                min_stake: self.min_stake,
            });
        }

        block.verify(&validator.public_key)?;

        let now = Utc::now().timestamp();
        if block.timestamp > now + self.block_time.as_secs() as i64 {
            return Err(ChainError::TimestampOutOfRange(format!(
                "block timestamp {} is too far in the future",
                block.timestamp
            )));
        }

        if let Some(prev) = prev {
            if block.timestamp <= prev.timestamp {
                return Err(ChainError::TimestampOutOfRange(format!(
                    "block timestamp {} is not after previous {}",
                    block.timestamp, prev.timestamp
                )));
            }
        }

        Ok(())
    }

    /// The earliest time the next block may be produced.
    pub fn next_block_time(&self, last_timestamp: i64) -> i64 {
        last_timestamp + self.block_time.as_secs() as i64
    }

    /// Whether a full block interval has elapsed since `last_timestamp`.
    pub fn should_create_block(&self, last_timestamp: i64) -> bool {
        Utc::now().timestamp() >= self.next_block_time(last_timestamp)
    }

    /// Reward for producing `block`: the base reward plus its fees.
    pub fn calculate_reward(&self, block: &Block) -> u64 {
        BLOCK_REWARD + block.total_fees()
    }
}
