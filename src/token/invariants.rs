//! Ledger invariant checks
//!
//! Every committed transition must leave the ledger in a state that passes
//! [`check_ledger`]. The checks are run under `debug_assert!` after each
//! mutation and unconditionally when a snapshot is loaded from disk.

use crate::token::ledger::Ledger;
use alloy_primitives::{Address, U256};
use thiserror::Error;

/// A broken ledger invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Conservation violated: balances sum to {sum}, total supply is {total_supply}")]
    Conservation { sum: U256, total_supply: U256 },
    #[error("Balances overflow 256 bits")]
    BalanceSumOverflow,
    #[error("Balance of {account} ({balance}) exceeds total supply ({total_supply})")]
    BalanceExceedsSupply {
        account: Address,
        balance: U256,
        total_supply: U256,
    },
    #[error("Total supply {total_supply} exceeds genesis supply {initial_supply}")]
    SupplyAboveGenesis {
        total_supply: U256,
        initial_supply: U256,
    },
    #[error("Zero balance stored for {0}")]
    ZeroBalanceEntry(Address),
    #[error("Zero allowance stored for {owner} -> {spender}")]
    ZeroAllowanceEntry { owner: Address, spender: Address },
}

/// Sum of all balances, or `None` if it does not fit in 256 bits
pub fn balance_sum<'a>(balances: impl IntoIterator<Item = &'a U256>) -> Option<U256> {
    balances
        .into_iter()
        .try_fold(U256::ZERO, |acc, balance| acc.checked_add(*balance))
}

/// Run every invariant check against a ledger
pub fn check_ledger(ledger: &Ledger) -> Result<(), InvariantViolation> {
    let total_supply = ledger.total_supply();

    let initial_supply = ledger.metadata().initial_supply;
    if total_supply > initial_supply {
        return Err(InvariantViolation::SupplyAboveGenesis {
            total_supply,
            initial_supply,
        });
    }

    for (account, balance) in ledger.balances() {
        if balance.is_zero() {
            return Err(InvariantViolation::ZeroBalanceEntry(*account));
        }
        if *balance > total_supply {
            return Err(InvariantViolation::BalanceExceedsSupply {
                account: *account,
                balance: *balance,
                total_supply,
            });
        }
    }

    let sum = balance_sum(ledger.balances().map(|(_, balance)| balance))
        .ok_or(InvariantViolation::BalanceSumOverflow)?;
    if sum != total_supply {
        return Err(InvariantViolation::Conservation { sum, total_supply });
    }

    for (owner, spender, amount) in ledger.allowances() {
        if amount.is_zero() {
            return Err(InvariantViolation::ZeroAllowanceEntry {
                owner: *owner,
                spender: *spender,
            });
        }
    }

    Ok(())
}
