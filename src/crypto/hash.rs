//! Hashing utilities for the ledger
//!
//! SHA-256 is used to derive the ledger's identity address from its genesis
//! parameters; Keccak-256 produces the event topics indexers filter on.

use alloy_primitives::{keccak256, Address, B256};
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive a 20-byte address from arbitrary seed material.
///
/// The address is the first 20 bytes of the SHA-256 digest of the seed.
pub fn derive_address(seed: &[u8]) -> Address {
    let hash = sha256(seed);
    Address::from_slice(&hash[..20])
}

/// Keccak-256 of a canonical event signature, e.g. `Transfer(address,address,uint256)`
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}
