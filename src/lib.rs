//! Token Ledger: a fungible-token ledger in Rust
//!
//! This crate provides a single-token ledger featuring:
//! - Fixed genesis supply credited to one account
//! - Transfers, allowances and delegated transfers
//! - Burns, direct and delegated, as the only supply reduction
//! - Approve-and-call with rollback of the approval and callback effects
//! - An ordered, replayable event log with Keccak topics
//! - A single-writer async service for concurrent submitters
//! - JSON snapshot persistence with backups
//!
//! # Example
//!
//! ```rust
//! use token_ledger::token::{GenesisConfig, Ledger};
//! use alloy_primitives::{Address, U256};
//!
//! let config = GenesisConfig::default();
//! let mut ledger = Ledger::new(&config).unwrap();
//!
//! let recipient = Address::with_last_byte(7);
//! ledger
//!     .transfer(config.genesis_account, recipient, U256::from(1_000u64))
//!     .unwrap();
//! ledger.burn(recipient, U256::from(400u64)).unwrap();
//!
//! assert_eq!(ledger.balance_of(&recipient), U256::from(600u64));
//! assert_eq!(ledger.events().len(), 2);
//! ```

pub mod cli;
pub mod crypto;
pub mod runtime;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use runtime::{LedgerHandle, LedgerService, ServiceConfig, ServiceError};
pub use storage::{Storage, StorageConfig, StorageError};
pub use token::{
    ApprovalReceiver, ContractRegistry, EventRecord, GenesisConfig, Ledger, LedgerError,
    LedgerEvent, Operation, Query, QueryResult, Receipt, TokenMetadata,
};
