//! Error types for Meridian

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    InsufficientBalance { balance: u64, required: u64 },
    InsufficientStake { stake: u64, requested: u64 },
    DuplicateTransaction(String),
    InvalidSignature(String),
    InvalidBlock(String),
    UnknownValidator(String),
    ValidatorExists(String),
    StakeBelowMinimum { stake: u64, min_stake: u64 },
    NoEligibleValidators,
    TimestampOutOfRange(String),
    NotFound(String),
    MalformedInput(String),
    IoError(String),
    CodecError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InsufficientBalance { balance, required } => {
                write!(f, "insufficient balance: has {}, needs {}", balance, required)
            }
            ChainError::InsufficientStake { stake, requested } => {
                write!(f, "insufficient stake: has {}, requested {}", stake, requested)
            }
            ChainError::DuplicateTransaction(id) => {
                write!(f, "transaction {} already exists", id)
            }
            ChainError::InvalidSignature(msg) => write!(f, "invalid signature: {}", msg),
            ChainError::InvalidBlock(msg) => write!(f, "invalid block: {}", msg),
            ChainError::UnknownValidator(addr) => write!(f, "validator {} not found", addr),
            ChainError::ValidatorExists(addr) => {
                write!(f, "validator {} already registered", addr)
            }
            ChainError::StakeBelowMinimum { stake, min_stake } => {
                write!(f, "stake {} is below minimum {}", stake, min_stake)
            }
            ChainError::NoEligibleValidators => write!(f, "no eligible validators"),
            ChainError::TimestampOutOfRange(msg) => {
                write!(f, "timestamp out of range: {}", msg)
            }
            ChainError::NotFound(msg) => write!(f, "not found: {}", msg),
            ChainError::MalformedInput(msg) => write!(f, "malformed input: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::CodecError(msg) => write!(f, "codec error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::CodecError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::CodecError(err.to_string())
    }
}

impl From<hex::FromHexError> for ChainError {
    fn from(err: hex::FromHexError) -> Self {
        ChainError::MalformedInput(format!("invalid hex: {}", err))
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
