//! Concurrent access to a ledger
//!
//! All mutations go through a single task that owns the ledger; see
//! [`LedgerService`].

pub mod service;

pub use service::{LedgerHandle, LedgerService, ServiceConfig, ServiceError};
