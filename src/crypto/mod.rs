//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and address derivation
//! - Keccak-256 event topics

pub mod hash;

pub use hash::{derive_address, event_topic, sha256, sha256_hex};
