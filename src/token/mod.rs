//! Fungible token ledger
//!
//! Provides the ledger state machine with:
//! - Balances per address and a fixed genesis supply
//! - Allowances for delegated transfers and burns
//! - Burns as the only way supply changes after genesis
//! - Approval callbacks with all-or-nothing rollback
//! - An ordered event log that replays to the live state
//!
//! # Example
//!
//! ```rust
//! use token_ledger::token::Ledger;
//! use alloy_primitives::{Address, U256};
//!
//! let holder = Address::with_last_byte(1);
//! let mut ledger = Ledger::with_supply(U256::from(1_000_000u64), holder).unwrap();
//!
//! ledger
//!     .transfer(holder, Address::with_last_byte(2), U256::from(100u64))
//!     .unwrap();
//! ledger.burn(holder, U256::from(50u64)).unwrap();
//!
//! assert_eq!(ledger.total_supply(), U256::from(999_950u64));
//! ```

pub mod callback;
pub mod error;
pub mod events;
pub mod genesis;
pub mod invariants;
pub mod ledger;
pub mod operation;
pub mod replay;

pub use callback::{
    ApprovalCall, ApprovalReceiver, CallbackError, ContractRegistry, NoContracts, Spender,
    SpenderRegistry,
};
pub use error::{parse_address, parse_amount, LedgerError};
pub use events::{EventLog, EventRecord, LedgerEvent, BURN_SIGNATURE, TRANSFER_SIGNATURE};
pub use genesis::{GenesisConfig, GenesisError, TokenMetadata};
pub use invariants::InvariantViolation;
pub use ledger::Ledger;
pub use operation::{Operation, Query, QueryResult, Receipt};
pub use replay::{fold_events, ReplayError, ReplayState};
