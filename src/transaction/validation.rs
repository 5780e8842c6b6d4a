//! Signature validation for transactions

use crate::crypto;
use crate::error::ChainError;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Verifies the transaction signature.
    ///
    /// Coinbase transactions are unsigned by contract; callers must gate on
    /// [`Transaction::is_coinbase`] before calling this.
    pub fn verify(&self) -> Result<(), ChainError> {
        if self.signature.is_empty() {
            return Err(ChainError::InvalidSignature(
                "transaction not signed".to_string(),
            ));
        }

        let public_key = crypto::public_key_from_hex(&self.public_key)?;

        // The sender must own the public key it claims.
        let expected_from = crypto::public_key_to_address(&public_key);
        if self.from != expected_from {
            return Err(ChainError::InvalidSignature(
                "from address does not match public key".to_string(),
            ));
        }

        let signature = crypto::signature_from_hex(&self.signature)?;
        if !crypto::verify(&public_key, &self.data_to_sign(), &signature) {
            return Err(ChainError::InvalidSignature(
                "transaction signature does not verify".to_string(),
            ));
        }

        Ok(())
    }
}
