//! Wallet files: a JSON keystore holding one Ed25519 identity
//!
//! The file is written with owner-only permissions since it contains the
//! private key.

use crate::crypto::KeyPair;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub public_key: String,
    pub private_key: String,
}

impl Wallet {
    /// Creates a wallet around a freshly generated key pair.
    pub fn new() -> Result<Self, ChainError> {
        let keypair = KeyPair::generate()?;
        Ok(Wallet {
            address: keypair.address(),
            public_key: keypair.public_key_hex(),
            private_key: keypair.private_key_hex(),
        })
    }

    /// Saves the wallet as pretty-printed JSON, mode 0600.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ChainError> {
        let data = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(data.as_bytes())?;
        }
        #[cfg(not(unix))]
        fs::write(path, data)?;

        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Reconstructs the signing key pair from the stored hex keys.
    pub fn keypair(&self) -> Result<KeyPair, ChainError> {
        let keypair = KeyPair::from_private_hex(&self.private_key)?;
        if keypair.public_key_hex() != self.public_key {
            return Err(ChainError::MalformedInput(
                "wallet public key does not match private key".to_string(),
            ));
        }
        Ok(keypair)
    }
}
