/// Transaction type for Meridian
use crate::crypto::{self, KeyPair};
use crate::error::ChainError;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A transfer of Meridian tokens.
///
/// A transaction with an empty `from` is a coinbase: it mints the block
/// reward (or the initial supply) and carries no fee, timestamp or
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: i64,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
}

impl Transaction {
    /// Creates an unsigned transaction stamped with the current time.
    pub fn new(from: &str, to: &str, amount: u64, fee: u64) -> Self {
        let mut tx = Transaction {
            id: String::new(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
            fee,
            timestamp: Utc::now().timestamp(),
            signature: String::new(),
            public_key: String::new(),
        };
        tx.id = tx.calculate_id();
        tx
    }

    /// Creates a coinbase transaction crediting `to` with `amount`.
    pub fn coinbase(to: &str, amount: u64) -> Self {
        let mut tx = Transaction {
            id: String::new(),
            from: String::new(),
            to: to.to_string(),
            amount,
            fee: 0,
            timestamp: 0,
            signature: String::new(),
            public_key: String::new(),
        };
        tx.id = tx.calculate_id();
        tx
    }

    /// Derives the transaction id: SHA-256 over the ASCII concatenation of
    /// the content fields, hex-encoded.
    pub fn calculate_id(&self) -> String {
        let data = format!(
            "{}{}{}{}{}",
            self.from, self.to, self.amount, self.fee, self.timestamp
        );
        crypto::hash_hex(data.as_bytes())
    }

    /// The payload covered by the transaction signature.
    pub fn data_to_sign(&self) -> Vec<u8> {
        format!(
            "{}{}{}{}{}{}",
            self.id, self.from, self.to, self.amount, self.fee, self.timestamp
        )
        .into_bytes()
    }

    /// Signs the transaction, attaching the signature and public key.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.public_key = keypair.public_key_hex();
        let signature = keypair.sign(&self.data_to_sign());
        self.signature = crypto::signature_to_hex(&signature);
    }

    pub fn is_coinbase(&self) -> bool {
        self.from.is_empty()
    }

    /// Binary encoding for peer exchange.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ChainError> {
        Ok(bincode::deserialize(data)?)
    }
}
