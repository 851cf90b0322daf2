//! Rebuilding ledger state from the event log
//!
//! An observer that starts from the genesis parameters and folds every
//! committed record in order ends up with the same balances and total supply
//! as the live ledger.

use crate::token::events::{EventRecord, LedgerEvent};
use crate::token::genesis::GenesisConfig;
use crate::token::ledger::Ledger;
use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors found while folding an event log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },
    #[error("Event {sequence} is inconsistent: {reason}")]
    Inconsistent { sequence: u64, reason: String },
}

/// Balances and supply rebuilt from events
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayState {
    pub balances: BTreeMap<Address, U256>,
    pub total_supply: U256,
    /// Sequence the next record must carry
    pub next_sequence: u64,
}

impl ReplayState {
    /// State right after genesis
    pub fn genesis(config: &GenesisConfig) -> Self {
        let mut balances = BTreeMap::new();
        if !config.initial_supply.is_zero() {
            balances.insert(config.genesis_account, config.initial_supply);
        }

        Self {
            balances,
            total_supply: config.initial_supply,
            next_sequence: 0,
        }
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }

    /// Fold one record into the state
    pub fn apply(&mut self, record: &EventRecord) -> Result<(), ReplayError> {
        if record.sequence != self.next_sequence {
            return Err(ReplayError::SequenceGap {
                expected: self.next_sequence,
                found: record.sequence,
            });
        }

        match &record.event {
            LedgerEvent::Transfer { from, to, value } => {
                self.debit(record.sequence, from, *value)?;
                self.credit(record.sequence, to, *value)?;
            }
            LedgerEvent::Burn { from, value } => {
                self.debit(record.sequence, from, *value)?;
                self.total_supply = self.total_supply.checked_sub(*value).ok_or_else(|| {
                    ReplayError::Inconsistent {
                        sequence: record.sequence,
                        reason: "burn exceeds total supply".to_string(),
                    }
                })?;
            }
        }

        self.next_sequence += 1;
        Ok(())
    }

    fn debit(&mut self, sequence: u64, account: &Address, value: U256) -> Result<(), ReplayError> {
        let balance = self.balance_of(account);
        let remaining = balance
            .checked_sub(value)
            .ok_or_else(|| ReplayError::Inconsistent {
                sequence,
                reason: format!("{} holds {}, event moves {}", account, balance, value),
            })?;

        if remaining.is_zero() {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, remaining);
        }
        Ok(())
    }

    fn credit(&mut self, sequence: u64, account: &Address, value: U256) -> Result<(), ReplayError> {
        let credited = self
            .balance_of(account)
            .checked_add(value)
            .ok_or_else(|| ReplayError::Inconsistent {
                sequence,
                reason: format!("credit to {} overflows", account),
            })?;

        if !credited.is_zero() {
            self.balances.insert(*account, credited);
        }
        Ok(())
    }
}

/// Fold a complete event log, starting from genesis
pub fn fold_events<'a>(
    config: &GenesisConfig,
    records: impl IntoIterator<Item = &'a EventRecord>,
) -> Result<ReplayState, ReplayError> {
    let mut state = ReplayState::genesis(config);
    for record in records {
        state.apply(record)?;
    }
    Ok(state)
}

impl Ledger {
    /// Fold this ledger's own event log from its genesis
    pub fn replay(&self) -> Result<ReplayState, ReplayError> {
        fold_events(&self.metadata().genesis(), self.events().iter())
    }

    /// Check that the event log reproduces the live balances and supply
    pub fn replay_matches(&self) -> Result<bool, ReplayError> {
        let replayed = self.replay()?;
        Ok(replayed.balances == self.balances_snapshot()
            && replayed.total_supply == self.total_supply())
    }
}
