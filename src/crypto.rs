//! Cryptographic primitives for Meridian
//!
//! Ed25519 keys and signatures, SHA-256 hashing, and the hex helpers the
//! rest of the crate uses for wire and API encodings.

use crate::error::ChainError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Raw Ed25519 public key length in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Private keys travel in the expanded 64-byte form (seed followed by the
/// public key), matching the wallet file and API encodings.
pub const PRIVATE_KEY_SIZE: usize = 64;
/// Detached Ed25519 signature length in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Addresses are the first 20 bytes of SHA-256 over the raw public key,
/// hex-encoded: 40 lowercase hex characters.
pub const ADDRESS_LENGTH: usize = 40;

#[derive(Clone)]
pub struct KeyPair {
    pub public_key: VerifyingKey,
    pub private_key: SigningKey,
}

impl KeyPair {
    /// Generates a new random key pair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let private_key = SigningKey::generate(&mut OsRng);
        let public_key = private_key.verifying_key();
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// Reconstructs a key pair from a hex-encoded 64-byte private key.
    pub fn from_private_hex(hex_key: &str) -> Result<Self, ChainError> {
        let private_key = private_key_from_hex(hex_key)?;
        let public_key = private_key.verifying_key();
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// Derives the chain address for this key pair.
    pub fn address(&self) -> String {
        public_key_to_address(&self.public_key)
    }

    pub fn public_key_hex(&self) -> String {
        public_key_to_hex(&self.public_key)
    }

    pub fn private_key_hex(&self) -> String {
        private_key_to_hex(&self.private_key)
    }

    /// Signs a message, returning the detached 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.private_key.sign(message).to_bytes()
    }
}

/// Derives an address from a public key: first 20 bytes of SHA-256 over the
/// raw key, hex-encoded.
pub fn public_key_to_address(public_key: &VerifyingKey) -> String {
    let digest = hash(public_key.as_bytes());
    hex::encode(&digest[..20])
}

/// Verifies a detached signature over a message.
pub fn verify(public_key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature).is_ok()
}

/// SHA-256 digest of the input.
pub fn hash(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hex-encoded SHA-256 digest.
pub fn hash_hex(data: &[u8]) -> String {
    hex::encode(hash(data))
}

pub fn public_key_to_hex(public_key: &VerifyingKey) -> String {
    hex::encode(public_key.as_bytes())
}

pub fn private_key_to_hex(private_key: &SigningKey) -> String {
    hex::encode(private_key.to_keypair_bytes())
}

pub fn public_key_from_hex(hex_key: &str) -> Result<VerifyingKey, ChainError> {
    let bytes = hex::decode(hex_key)?;
    let bytes: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
        ChainError::MalformedInput(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            b.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| ChainError::MalformedInput(format!("invalid public key: {}", e)))
}

pub fn private_key_from_hex(hex_key: &str) -> Result<SigningKey, ChainError> {
    let bytes = hex::decode(hex_key)?;
    let bytes: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
        ChainError::MalformedInput(format!(
            "private key must be {} bytes, got {}",
            PRIVATE_KEY_SIZE,
            b.len()
        ))
    })?;
    SigningKey::from_keypair_bytes(&bytes)
        .map_err(|e| ChainError::MalformedInput(format!("invalid private key: {}", e)))
}

pub fn signature_from_hex(hex_sig: &str) -> Result<Signature, ChainError> {
    let bytes = hex::decode(hex_sig)?;
    let bytes: [u8; SIGNATURE_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
        ChainError::MalformedInput(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_SIZE,
            b.len()
        ))
    })?;
    Ok(Signature::from_bytes(&bytes))
}

pub fn signature_to_hex(signature: &[u8]) -> String {
    hex::encode(signature)
}
