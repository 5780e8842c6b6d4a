//! Monetary rules of the Meridian network

use std::time::Duration;

/// Tokens credited to the genesis address at chain creation
pub const INITIAL_SUPPLY: u64 = 1_000_000;

/// Reward paid to the producing validator via the block's coinbase
pub const BLOCK_REWARD: u64 = 50;

/// Minimum stake required to register as a validator
pub const MIN_STAKE: u64 = 1_000;

/// Target interval between blocks
pub const BLOCK_TIME: Duration = Duration::from_secs(5);
