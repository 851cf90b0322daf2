//! Approval callbacks
//!
//! `approve_and_call` is the only place the ledger hands control to code it
//! does not own. A spender either implements [`ApprovalReceiver`] or it does
//! not; the [`SpenderRegistry`] answers that question once, before the
//! ledger is touched.

use crate::token::error::LedgerError;
use crate::token::ledger::Ledger;
use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use thiserror::Error;

/// Arguments handed to a spender's approval callback
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalCall<'a> {
    /// Owner that granted the approval
    pub from: Address,
    /// Approved amount
    pub value: U256,
    /// Identity of the ledger making the call
    pub token: Address,
    /// Opaque payload supplied by the owner
    pub extra_data: &'a [u8],
}

/// Failure reported by a spender's callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct CallbackError {
    pub reason: String,
}

impl CallbackError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<LedgerError> for CallbackError {
    fn from(err: LedgerError) -> Self {
        Self::new(err.to_string())
    }
}

/// Capability of a spender to be notified of an approval.
///
/// The callback receives the ledger itself and may call back into it (for
/// example to pull the approved funds with `transfer_from`). Everything it
/// does is undone if it returns an error.
pub trait ApprovalReceiver: Send {
    fn receive_approval(
        &mut self,
        ledger: &mut Ledger,
        call: &ApprovalCall<'_>,
    ) -> Result<(), CallbackError>;
}

/// What an address resolved to
pub enum Spender<'a> {
    /// The address accepts approval callbacks
    Receiver(&'a mut dyn ApprovalReceiver),
    /// Plain account without the capability
    Plain,
}

/// Lookup of spender capabilities by address
pub trait SpenderRegistry: Send {
    fn resolve(&mut self, spender: &Address) -> Spender<'_>;
}

/// Registry in which no address supports callbacks
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContracts;

impl SpenderRegistry for NoContracts {
    fn resolve(&mut self, _spender: &Address) -> Spender<'_> {
        Spender::Plain
    }
}

/// Registry of addresses backed by in-process receivers
#[derive(Default)]
pub struct ContractRegistry {
    receivers: HashMap<Address, Box<dyn ApprovalReceiver>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a receiver to an address, replacing any previous one
    pub fn register(&mut self, address: Address, receiver: impl ApprovalReceiver + 'static) {
        self.receivers.insert(address, Box::new(receiver));
    }

    /// Detach the receiver at an address
    pub fn unregister(&mut self, address: &Address) -> bool {
        self.receivers.remove(address).is_some()
    }

    /// Check if an address has a receiver
    pub fn contains(&self, address: &Address) -> bool {
        self.receivers.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

impl SpenderRegistry for ContractRegistry {
    fn resolve(&mut self, spender: &Address) -> Spender<'_> {
        match self.receivers.get_mut(spender) {
            Some(receiver) => Spender::Receiver(receiver.as_mut()),
            None => Spender::Plain,
        }
    }
}
