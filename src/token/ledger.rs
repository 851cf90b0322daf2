//! The token ledger
//!
//! Owns balances, allowances and total supply, and applies the transitions
//! that mutate them. Every transition is all-or-nothing: preconditions and
//! new values are computed first, and state is only written once nothing can
//! fail any more.

use crate::token::callback::{ApprovalCall, Spender, SpenderRegistry};
use crate::token::error::LedgerError;
use crate::token::events::{EventLog, EventRecord, LedgerEvent};
use crate::token::genesis::{GenesisConfig, GenesisError, TokenMetadata};
use crate::token::invariants::{self, InvariantViolation};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A fungible-token ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ledger {
    /// Identity address of this ledger
    address: Address,
    /// Token metadata (fixed at genesis)
    metadata: TokenMetadata,
    /// Current supply; only burns reduce it
    total_supply: U256,
    /// Balances: account -> amount. Zero balances are not stored.
    balances: HashMap<Address, U256>,
    /// Allowances: owner -> (spender -> amount). Zero allowances are not stored.
    allowances: HashMap<Address, HashMap<Address, U256>>,
    /// Emitted events
    events: EventLog,
    /// Prior values of entries written while a callback is running
    #[serde(skip)]
    journal: UndoJournal,
}

/// Entry values as they were before a write
#[derive(Clone, Debug)]
enum Undo {
    Balance(Address, U256),
    Allowance(Address, Address, U256),
}

/// Undo log for approval callbacks. Only records while `depth > 0`, so the
/// cost of a rollback is proportional to what the callback touched.
#[derive(Clone, Debug, Default)]
struct UndoJournal {
    depth: usize,
    entries: Vec<Undo>,
}

/// Marks where a callback started
struct Checkpoint {
    total_supply: U256,
    event_count: usize,
    journal_len: usize,
}

impl Ledger {
    /// Create a ledger with the whole supply credited to the genesis account
    pub fn new(config: &GenesisConfig) -> Result<Self, GenesisError> {
        let metadata = TokenMetadata::from_genesis(config)?;
        let address = config.ledger_address();

        let mut balances = HashMap::new();
        balances.insert(config.genesis_account, config.initial_supply);

        log::info!(
            "Ledger created: {} ({}) at {}, supply {} held by {}",
            metadata.name,
            metadata.symbol,
            address,
            config.initial_supply,
            config.genesis_account
        );

        Ok(Self {
            address,
            metadata,
            total_supply: config.initial_supply,
            balances,
            allowances: HashMap::new(),
            events: EventLog::new(),
            journal: UndoJournal::default(),
        })
    }

    /// Create a ledger with default metadata and a custom supply
    pub fn with_supply(initial_supply: U256, genesis_account: Address) -> Result<Self, GenesisError> {
        Self::new(&GenesisConfig::with_supply(initial_supply, genesis_account))
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Identity address of the ledger
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Get token name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Get token symbol
    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    /// Get decimal places
    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    /// Get total supply
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Get balance of an account
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }

    /// Get the amount `spender` may still move out of `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// All non-zero allowances granted by an owner
    pub fn allowances_of(&self, owner: &Address) -> Vec<(Address, U256)> {
        let mut granted: Vec<(Address, U256)> = self
            .allowances
            .get(owner)
            .map(|spenders| spenders.iter().map(|(s, a)| (*s, *a)).collect())
            .unwrap_or_default();
        granted.sort();
        granted
    }

    /// Get all holders with balances, largest first
    pub fn holders(&self) -> Vec<(&Address, &U256)> {
        let mut holders: Vec<(&Address, &U256)> = self.balances.iter().collect();
        holders.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        holders
    }

    /// Get holder count
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate over stored balances
    pub fn balances(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    /// Iterate over stored allowances as (owner, spender, amount)
    pub fn allowances(&self) -> impl Iterator<Item = (&Address, &Address, &U256)> {
        self.allowances.iter().flat_map(|(owner, spenders)| {
            spenders
                .iter()
                .map(move |(spender, amount)| (owner, spender, amount))
        })
    }

    /// Balances in address order, for comparison and display
    pub fn balances_snapshot(&self) -> BTreeMap<Address, U256> {
        self.balances.iter().map(|(a, b)| (*a, *b)).collect()
    }

    /// Emitted events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Verify conservation and bounds
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        invariants::check_ledger(self)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Move `amount` from the caller to `to`.
    ///
    /// Sending to the zero address is an ordinary credit; use [`Ledger::burn`]
    /// to destroy tokens.
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<EventRecord, LedgerError> {
        self.move_balance(caller, to, amount)?;

        log::debug!("Transfer {} -> {}: {}", caller, to, amount);
        Ok(self.emit(LedgerEvent::Transfer {
            from: caller,
            to,
            value: amount,
        }))
    }

    /// Set the amount `spender` may move out of the caller's balance.
    ///
    /// Overwrites any previous allowance. A spender that observes the pending
    /// overwrite can still spend the old allowance first; owners who care
    /// should approve zero before approving a new amount.
    pub fn approve(&mut self, caller: Address, spender: Address, amount: U256) {
        self.set_allowance(caller, spender, amount);
        log::debug!("Approve {} -> {}: {}", caller, spender, amount);
    }

    /// Move `amount` from `from` to `to` using the caller's allowance
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<EventRecord, LedgerError> {
        let remaining = self.remaining_allowance(from, caller, amount)?;
        self.move_balance(from, to, amount)?;
        self.set_allowance(from, caller, remaining);

        log::debug!(
            "TransferFrom {} -> {} by {}: {}",
            from,
            to,
            caller,
            amount
        );
        Ok(self.emit(LedgerEvent::Transfer {
            from,
            to,
            value: amount,
        }))
    }

    /// Destroy `amount` of the caller's tokens
    pub fn burn(&mut self, caller: Address, amount: U256) -> Result<EventRecord, LedgerError> {
        let balance = self.debited_balance(caller, amount)?;
        let supply = self.reduced_supply(amount)?;

        self.set_balance(caller, balance);
        self.total_supply = supply;

        log::debug!("Burn {}: {} (supply {})", caller, amount, supply);
        Ok(self.emit(LedgerEvent::Burn {
            from: caller,
            value: amount,
        }))
    }

    /// Destroy `amount` of `from`'s tokens using the caller's allowance.
    ///
    /// Unlike [`Ledger::transfer_from`] the value is gone afterwards.
    pub fn burn_from(
        &mut self,
        caller: Address,
        from: Address,
        amount: U256,
    ) -> Result<EventRecord, LedgerError> {
        let balance = self.debited_balance(from, amount)?;
        let remaining = self.remaining_allowance(from, caller, amount)?;
        let supply = self.reduced_supply(amount)?;

        self.set_balance(from, balance);
        self.set_allowance(from, caller, remaining);
        self.total_supply = supply;

        log::debug!(
            "BurnFrom {} by {}: {} (supply {})",
            from,
            caller,
            amount,
            supply
        );
        Ok(self.emit(LedgerEvent::Burn { from, value: amount }))
    }

    /// Approve `spender` and notify it through its approval callback.
    ///
    /// The spender is resolved before anything changes. The approval is
    /// written before the callback runs, and if the callback fails the
    /// approval and everything the callback did to this ledger are undone.
    pub fn approve_and_call(
        &mut self,
        caller: Address,
        spender: Address,
        amount: U256,
        extra_data: &[u8],
        spenders: &mut dyn SpenderRegistry,
    ) -> Result<(), LedgerError> {
        let receiver = match spenders.resolve(&spender) {
            Spender::Receiver(receiver) => receiver,
            Spender::Plain => {
                log::warn!("approveAndCall rejected: {} has no approval callback", spender);
                return Err(LedgerError::CallbackUnsupported(spender));
            }
        };

        let checkpoint = self.checkpoint();
        self.approve(caller, spender, amount);

        let call = ApprovalCall {
            from: caller,
            value: amount,
            token: self.address,
            extra_data,
        };

        if let Err(err) = receiver.receive_approval(self, &call) {
            self.restore(checkpoint);
            log::warn!("approveAndCall on {} rolled back: {}", spender, err);
            return Err(LedgerError::CallbackFailed {
                spender,
                reason: err.reason,
            });
        }

        self.commit();
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn debited_balance(&self, account: Address, amount: U256) -> Result<U256, LedgerError> {
        let balance = self.balance_of(&account);
        balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                have: balance,
                need: amount,
            })
    }

    fn remaining_allowance(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<U256, LedgerError> {
        let allowance = self.allowance(&owner, &spender);
        allowance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                have: allowance,
                need: amount,
            })
    }

    fn reduced_supply(&self, amount: U256) -> Result<U256, LedgerError> {
        self.total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticUnderflow)
    }

    /// Debit `from` and credit `to`, writing nothing unless both succeed
    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let debited = self.debited_balance(from, amount)?;
        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;

        self.set_balance(from, debited);
        self.set_balance(to, credited);
        Ok(())
    }

    fn set_balance(&mut self, account: Address, amount: U256) {
        if self.journal.depth > 0 {
            let prior = self.balance_of(&account);
            self.journal.entries.push(Undo::Balance(account, prior));
        }
        self.write_balance(account, amount);
    }

    fn write_balance(&mut self, account: Address, amount: U256) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        if self.journal.depth > 0 {
            let prior = self.allowance(&owner, &spender);
            self.journal
                .entries
                .push(Undo::Allowance(owner, spender, prior));
        }
        self.write_allowance(owner, spender, amount);
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        if amount.is_zero() {
            if let Some(spenders) = self.allowances.get_mut(&owner) {
                spenders.remove(&spender);
                if spenders.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
        } else {
            self.allowances
                .entry(owner)
                .or_default()
                .insert(spender, amount);
        }
    }

    fn emit(&mut self, event: LedgerEvent) -> EventRecord {
        let record = self.events.append(self.address, event).clone();
        debug_assert!(
            self.check_invariants().is_ok(),
            "ledger invariant broken after event {}",
            record.sequence
        );
        record
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.journal.depth += 1;
        Checkpoint {
            total_supply: self.total_supply,
            event_count: self.events.len(),
            journal_len: self.journal.entries.len(),
        }
    }

    fn commit(&mut self) {
        self.journal.depth -= 1;
        // An enclosing callback may still fail and needs these entries
        if self.journal.depth == 0 {
            self.journal.entries.clear();
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        while self.journal.entries.len() > checkpoint.journal_len {
            match self.journal.entries.pop() {
                Some(Undo::Balance(account, amount)) => self.write_balance(account, amount),
                Some(Undo::Allowance(owner, spender, amount)) => {
                    self.write_allowance(owner, spender, amount)
                }
                None => break,
            }
        }
        self.journal.depth -= 1;
        self.total_supply = checkpoint.total_supply;
        self.events.truncate(checkpoint.event_count);
    }
}
