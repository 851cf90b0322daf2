//! Genesis parameters and immutable token metadata

use crate::crypto::derive_address;
use alloy_primitives::{address, Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default token name
pub const DEFAULT_NAME: &str = "TriCoin";
/// Default token symbol
pub const DEFAULT_SYMBOL: &str = "TRI";
/// Default decimal precision
pub const DEFAULT_DECIMALS: u8 = 18;
/// Default initial supply: 100 whole tokens at 18 decimals
pub const DEFAULT_INITIAL_SUPPLY: u128 = 100_000_000_000_000_000_000;
/// Account credited with the whole supply when no other is configured
pub const DEFAULT_GENESIS_ACCOUNT: Address = address!("dd06426c25e2a21a121613be469c025088e89d35");

/// Genesis validation and loading errors
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("Invalid name: must be 1-50 characters")]
    InvalidName,
    #[error("Invalid symbol: must be 1-10 characters")]
    InvalidSymbol,
    #[error("Invalid decimals: must be 0-18")]
    InvalidDecimals,
    #[error("Invalid supply: must be greater than 0")]
    InvalidSupply,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid genesis file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters fixed once at genesis
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenesisConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub initial_supply: U256,
    pub genesis_account: Address,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
            initial_supply: U256::from(DEFAULT_INITIAL_SUPPLY),
            genesis_account: DEFAULT_GENESIS_ACCOUNT,
        }
    }
}

impl GenesisConfig {
    /// Genesis with the default metadata but a custom supply and holder
    pub fn with_supply(initial_supply: U256, genesis_account: Address) -> Self {
        Self {
            initial_supply,
            genesis_account,
            ..Default::default()
        }
    }

    /// Load genesis parameters from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self, GenesisError> {
        let data = fs::read_to_string(path)?;
        let config: GenesisConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the parameters
    pub fn validate(&self) -> Result<(), GenesisError> {
        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > 50 {
            return Err(GenesisError::InvalidName);
        }

        let symbol_len = self.symbol.chars().count();
        if symbol_len == 0 || symbol_len > 10 {
            return Err(GenesisError::InvalidSymbol);
        }

        if self.decimals > 18 {
            return Err(GenesisError::InvalidDecimals);
        }

        if self.initial_supply.is_zero() {
            return Err(GenesisError::InvalidSupply);
        }

        Ok(())
    }

    /// Identity address of the ledger created from these parameters
    pub fn ledger_address(&self) -> Address {
        let seed = format!(
            "{}:{}:{}",
            self.genesis_account, self.symbol, self.initial_supply
        );
        derive_address(seed.as_bytes())
    }
}

/// Token metadata (immutable after genesis)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenMetadata {
    /// Token name (e.g., "TriCoin")
    pub name: String,
    /// Token symbol (e.g., "TRI")
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Account that received the initial supply
    pub genesis_account: Address,
    /// Supply credited at genesis
    pub initial_supply: U256,
    /// Timestamp of genesis
    pub created_at: DateTime<Utc>,
}

impl TokenMetadata {
    /// Create metadata from validated genesis parameters
    pub fn from_genesis(config: &GenesisConfig) -> Result<Self, GenesisError> {
        config.validate()?;

        Ok(Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
            genesis_account: config.genesis_account,
            initial_supply: config.initial_supply,
            created_at: Utc::now(),
        })
    }

    /// Genesis parameters these metadata were created from
    pub fn genesis(&self) -> GenesisConfig {
        GenesisConfig {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            initial_supply: self.initial_supply,
            genesis_account: self.genesis_account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_genesis() {
        let config = GenesisConfig::default();

        assert_eq!(config.name, "TriCoin");
        assert_eq!(config.symbol, "TRI");
        assert_eq!(config.decimals, 18);
        assert_eq!(
            config.initial_supply,
            U256::from(100u64) * U256::from(1_000_000_000_000_000_000u64)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_genesis_validation() {
        let mut config = GenesisConfig::default();
        config.name = String::new();
        assert!(matches!(config.validate(), Err(GenesisError::InvalidName)));

        let mut config = GenesisConfig::default();
        config.symbol = "TOOLONGSYMBOL".to_string();
        assert!(matches!(config.validate(), Err(GenesisError::InvalidSymbol)));

        let mut config = GenesisConfig::default();
        config.decimals = 19;
        assert!(matches!(
            config.validate(),
            Err(GenesisError::InvalidDecimals)
        ));

        let config = GenesisConfig::with_supply(U256::ZERO, Address::with_last_byte(1));
        assert!(matches!(config.validate(), Err(GenesisError::InvalidSupply)));
    }

    #[test]
    fn test_ledger_address_depends_on_genesis() {
        let a = GenesisConfig::with_supply(U256::from(1000u64), Address::with_last_byte(1));
        let b = GenesisConfig::with_supply(U256::from(1000u64), Address::with_last_byte(2));

        assert_eq!(a.ledger_address(), a.clone().ledger_address());
        assert_ne!(a.ledger_address(), b.ledger_address());
    }

    #[test]
    fn test_metadata_round_trips_genesis() {
        let config = GenesisConfig::with_supply(U256::from(1_000_000u64), Address::with_last_byte(7));
        let metadata = TokenMetadata::from_genesis(&config).unwrap();

        assert_eq!(metadata.genesis(), config);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "name": "Test Token", "symbol": "TST", "initial_supply": "0xf4240" }}"#
        )
        .unwrap();

        let config = GenesisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.name, "Test Token");
        assert_eq!(config.symbol, "TST");
        assert_eq!(config.decimals, DEFAULT_DECIMALS);
        assert_eq!(config.initial_supply, U256::from(1_000_000u64));
        assert_eq!(config.genesis_account, DEFAULT_GENESIS_ACCOUNT);
    }

    #[test]
    fn test_from_file_rejects_invalid_genesis() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "decimals": 30 }}"#).unwrap();

        assert!(matches!(
            GenesisConfig::from_file(file.path()),
            Err(GenesisError::InvalidDecimals)
        ));
    }
}
