//! Integration tests for wallet files and the transactions signed with
//! the keys they hold.

use meridian::blockchain::Blockchain;
use meridian::crypto::{KeyPair, ADDRESS_LENGTH};
use meridian::transaction::Transaction;
use meridian::wallet::Wallet;
use tempfile::TempDir;

#[test]
fn test_wallet_creation() {
    let wallet = Wallet::new().unwrap();

    assert_eq!(wallet.address.len(), ADDRESS_LENGTH);
    assert!(wallet.address.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(wallet.public_key.len(), 64);
    assert_eq!(wallet.private_key.len(), 128);
}

#[test]
fn test_wallets_are_distinct() {
    let alice = Wallet::new().unwrap();
    let bob = Wallet::new().unwrap();

    assert_ne!(alice.address, bob.address);
    assert_ne!(alice.private_key, bob.private_key);
}

#[test]
fn test_wallet_persistence_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet.json");

    let original = Wallet::new().unwrap();
    original.save(&path).unwrap();
    assert!(path.exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let loaded = Wallet::load(&path).unwrap();
    assert_eq!(loaded.address, original.address);
    assert_eq!(loaded.public_key, original.public_key);
    assert_eq!(loaded.private_key, original.private_key);
}

#[test]
fn test_wallet_keypair_matches_address() {
    let wallet = Wallet::new().unwrap();
    let keypair = wallet.keypair().unwrap();
    assert_eq!(keypair.address(), wallet.address);
    assert_eq!(keypair.public_key_hex(), wallet.public_key);
}

#[test]
fn test_corrupt_wallet_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Wallet::load(&path).is_err());

    let mut wallet = Wallet::new().unwrap();
    wallet.public_key = Wallet::new().unwrap().public_key;
    assert!(wallet.keypair().is_err());
}

#[test]
fn test_wallet_key_signs_spendable_transaction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet.json");

    let wallet = Wallet::new().unwrap();
    wallet.save(&path).unwrap();

    // A fresh process would load the wallet back and spend from it.
    let keypair = Wallet::load(&path).unwrap().keypair().unwrap();
    let mut chain = Blockchain::new(&wallet.address, 1_000);

    let mut tx = Transaction::new(&wallet.address, "bob", 100, 1);
    tx.sign(&keypair);
    chain.add_transaction(tx).unwrap();

    let mut block = chain.create_block(&wallet.address);
    block.sign(&keypair.private_key);
    chain.add_block(block).unwrap();

    assert_eq!(chain.state.balance("bob"), 100);
}

#[test]
fn test_signature_round_trip_through_hex() {
    let keypair = KeyPair::generate().unwrap();
    let restored = KeyPair::from_private_hex(&keypair.private_key_hex()).unwrap();

    let mut tx = Transaction::new(&keypair.address(), "bob", 5, 0);
    tx.sign(&restored);
    assert!(tx.verify().is_ok());
}
