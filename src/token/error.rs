//! Ledger errors and boundary parsing helpers

use alloy_primitives::{Address, U256};
use std::str::FromStr;
use thiserror::Error;

/// Reasons a ledger operation is rejected.
///
/// Every variant is terminal for the operation that raised it: the ledger is
/// left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: U256, need: U256 },
    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: U256, need: U256 },
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    #[error("Arithmetic underflow")]
    ArithmeticUnderflow,
    #[error("Spender {0} does not accept approval callbacks")]
    CallbackUnsupported(Address),
    #[error("Approval callback on {spender} failed: {reason}")]
    CallbackFailed { spender: Address, reason: String },
    #[error("Malformed address: {0}")]
    MalformedAddress(String),
    #[error("Malformed amount: {0}")]
    MalformedAmount(String),
}

/// Parse a hex address (with or without `0x` prefix)
pub fn parse_address(input: &str) -> Result<Address, LedgerError> {
    Address::from_str(input.trim()).map_err(|_| LedgerError::MalformedAddress(input.to_string()))
}

/// Parse an unsigned 256-bit amount, decimal or `0x`-prefixed hex
pub fn parse_amount(input: &str) -> Result<U256, LedgerError> {
    let trimmed = input.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(digits) => U256::from_str_radix(digits, 16),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|_| LedgerError::MalformedAmount(input.to_string()))
}
