//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface.

use crate::runtime::{LedgerService, ServiceConfig, ServiceError};
use crate::storage::{Storage, StorageConfig};
use crate::token::{
    ContractRegistry, GenesisConfig, Ledger, LedgerEvent, Operation, Receipt,
};
use alloy_primitives::Address;
use std::fs;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub ledger: Ledger,
    pub storage: Storage,
    /// Spenders with approval callbacks. The CLI hosts none.
    pub spenders: ContractRegistry,
    pub data_dir: PathBuf,
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

impl AppState {
    /// Load application state from an initialized data directory
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        if !storage.exists() {
            return Err(format!(
                "No ledger found in {:?}. Run `token-ledger init` first.",
                data_dir
            )
            .into());
        }

        let ledger = storage.load()?;

        Ok(Self {
            ledger,
            storage,
            spenders: ContractRegistry::new(),
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.ledger)?;
        Ok(())
    }
}

/// Create a new ledger at genesis
pub fn cmd_init(data_dir: &Path, genesis_file: Option<&Path>, force: bool) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() && !force {
        println!("⚠️  Ledger already exists at {:?}", data_dir);
        println!("   Use --force to reinitialize (this will delete existing data)");
        return Ok(());
    }

    let config = match genesis_file {
        Some(path) => GenesisConfig::from_file(path)?,
        None => GenesisConfig::default(),
    };

    let ledger = Ledger::new(&config)?;
    if storage.exists() {
        storage.delete()?;
        println!("🗑️  Existing ledger and backups deleted");
    }
    storage.save(&ledger)?;

    println!("✅ Ledger initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🪙 Token: {} ({})", ledger.name(), ledger.symbol());
    println!("   🔢 Decimals: {}", ledger.decimals());
    println!("   💰 Supply: {}", ledger.total_supply());
    println!("   👤 Genesis account: {}", config.genesis_account);
    println!("   📍 Ledger address: {}", ledger.address());

    Ok(())
}

/// Display ledger info
pub fn cmd_info(state: &AppState) -> CliResult<()> {
    let ledger = &state.ledger;
    let metadata = ledger.metadata();

    println!("🪙 {} ({})", ledger.name(), ledger.symbol());
    println!("   ├─ Address: {}", ledger.address());
    println!("   ├─ Decimals: {}", ledger.decimals());
    println!("   ├─ Genesis supply: {}", metadata.initial_supply);
    println!("   ├─ Total supply: {}", ledger.total_supply());
    println!("   ├─ Holders: {}", ledger.holder_count());
    println!("   ├─ Events: {}", ledger.events().len());
    println!(
        "   └─ Created: {}",
        metadata.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    let holders = ledger.holders();
    if !holders.is_empty() {
        println!("\n   Top holders:");
        for (account, balance) in holders.iter().take(10) {
            println!("   └─ {} = {}", account, balance);
        }
        if holders.len() > 10 {
            println!("   ... and {} more", holders.len() - 10);
        }
    }

    Ok(())
}

/// Show an account's balance and the allowances it granted
pub fn cmd_balance(state: &AppState, account: &Address) -> CliResult<()> {
    let balance = state.ledger.balance_of(account);

    println!("💰 Balance for {}", account);
    println!("   Total: {} {}", balance, state.ledger.symbol());

    let granted = state.ledger.allowances_of(account);
    if !granted.is_empty() {
        println!("\n   Allowances granted:");
        for (spender, amount) in granted {
            println!("   └─ {} may spend {}", spender, amount);
        }
    }

    Ok(())
}

/// Show a single allowance
pub fn cmd_allowance(state: &AppState, owner: &Address, spender: &Address) -> CliResult<()> {
    let amount = state.ledger.allowance(owner, spender);
    println!("🔏 Allowance {} -> {}: {}", owner, spender, amount);
    Ok(())
}

fn print_receipt(receipt: &Receipt) {
    println!("✅ {} committed", receipt.operation);
    for record in &receipt.events {
        match &record.event {
            LedgerEvent::Transfer { from, to, value } => {
                println!("   └─ #{} Transfer {} -> {}: {}", record.sequence, from, to, value)
            }
            LedgerEvent::Burn { from, value } => {
                println!("   └─ #{} Burn {}: {}", record.sequence, from, value)
            }
        }
    }
}

/// Apply a single operation and save. A rejection is returned as the error.
pub fn cmd_submit(state: &mut AppState, operation: &Operation) -> CliResult<()> {
    match operation.apply(&mut state.ledger, &mut state.spenders) {
        Ok(receipt) => {
            print_receipt(&receipt);
            state.save()?;
            Ok(())
        }
        Err(err) => {
            println!("❌ {} rejected: {}", operation.name(), err);
            Err(err.into())
        }
    }
}

/// Apply a JSON script of operations in order through the ledger service
pub fn cmd_run(state: &mut AppState, script: &Path) -> CliResult<()> {
    let data = fs::read_to_string(script)?;
    let operations: Vec<Operation> = serde_json::from_str(&data)?;
    let total = operations.len();

    println!("📜 Running {} operation(s) from {:?}", total, script);

    let spenders = std::mem::take(&mut state.spenders);
    let rt = tokio::runtime::Runtime::new()?;

    let (ledger, committed) = rt.block_on(async {
        let (handle, task) =
            LedgerService::spawn(state.ledger.clone(), spenders, ServiceConfig::default());

        let mut committed = 0usize;
        for (index, operation) in operations.into_iter().enumerate() {
            let name = operation.name();
            match handle.submit(operation).await {
                Ok(receipt) => {
                    committed += 1;
                    print_receipt(&receipt);
                }
                Err(ServiceError::Ledger(err)) => {
                    println!("❌ [{}] {} rejected: {}", index, name, err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        drop(handle);
        let ledger = task.await?;
        Ok::<_, Box<dyn std::error::Error>>((ledger, committed))
    })?;

    state.ledger = ledger;
    if committed > 0 {
        state.save()?;
    }

    println!("\n   {} committed, {} rejected", committed, total - committed);
    Ok(())
}

/// List events from a cursor
pub fn cmd_events(state: &AppState, since: u64, json: bool) -> CliResult<()> {
    let records = state.ledger.events().since(since);

    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("📭 No events since #{}", since);
        return Ok(());
    }

    println!("📜 Events since #{}:", since);
    for record in records {
        let topic = record.event.topic();
        match &record.event {
            LedgerEvent::Transfer { from, to, value } => println!(
                "   #{} | {} | Transfer {} -> {}: {} | {}",
                record.sequence,
                record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                from,
                to,
                value,
                &hex::encode(topic)[..8]
            ),
            LedgerEvent::Burn { from, value } => println!(
                "   #{} | {} | Burn {}: {} | {}",
                record.sequence,
                record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                from,
                value,
                &hex::encode(topic)[..8]
            ),
        }
    }
    println!("\n   Resume cursor: {}", state.ledger.events().next_sequence());

    Ok(())
}

/// Check invariants and replay the event log
pub fn cmd_verify(state: &AppState) -> CliResult<()> {
    println!("🔍 Verifying ledger...");

    if let Err(violation) = state.ledger.check_invariants() {
        println!("❌ Invariant check FAILED: {}", violation);
        return Ok(());
    }
    println!("   ✅ Conservation holds");

    match state.ledger.replay_matches() {
        Ok(true) => println!(
            "   ✅ {} events replay to the current state",
            state.ledger.events().len()
        ),
        Ok(false) => println!("   ❌ Event replay does not match the current state"),
        Err(err) => println!("   ❌ Event log is inconsistent: {}", err),
    }

    Ok(())
}

/// Export the ledger snapshot to a file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.ledger, path)?;
    println!("📦 Ledger exported to {:?}", path);
    Ok(())
}

/// Import a ledger snapshot from a file
pub fn cmd_import(state: &mut AppState, path: &Path) -> CliResult<()> {
    let ledger = crate::storage::load_from_file(path)?;

    if !ledger.replay_matches()? {
        println!("❌ Imported ledger does not match its own event log!");
        return Ok(());
    }

    state.ledger = ledger;
    state.save()?;

    println!("📥 Ledger imported from {:?}", path);
    println!("   Events: {}", state.ledger.events().len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::LedgerError;
    use alloy_primitives::U256;

    #[test]
    fn test_init_submit_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().to_path_buf();

        cmd_init(&data_dir, None, false).unwrap();
        let mut state = AppState::new(data_dir.clone()).unwrap();
        let genesis = GenesisConfig::default();

        let recipient = Address::with_last_byte(2);
        cmd_submit(
            &mut state,
            &Operation::Transfer {
                caller: genesis.genesis_account,
                to: recipient,
                amount: U256::from(10u64),
            },
        )
        .unwrap();

        let reloaded = AppState::new(data_dir).unwrap();
        assert_eq!(reloaded.ledger.balance_of(&recipient), U256::from(10u64));
        assert_eq!(reloaded.ledger.events().len(), 1);
    }

    #[test]
    fn test_rejected_submit_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().to_path_buf();

        cmd_init(&data_dir, None, false).unwrap();
        let mut state = AppState::new(data_dir.clone()).unwrap();
        let pauper = Address::with_last_byte(2);

        let err = cmd_submit(
            &mut state,
            &Operation::Burn {
                caller: pauper,
                amount: U256::from(1u64),
            },
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InsufficientBalance { .. })
        ));
        let reloaded = AppState::new(data_dir).unwrap();
        assert!(reloaded.ledger.events().is_empty());
        assert_eq!(
            reloaded.ledger.total_supply(),
            GenesisConfig::default().initial_supply
        );
    }

    #[test]
    fn test_init_force_replaces_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().to_path_buf();
        let genesis = GenesisConfig::default().genesis_account;

        cmd_init(&data_dir, None, false).unwrap();
        let mut state = AppState::new(data_dir.clone()).unwrap();
        cmd_submit(
            &mut state,
            &Operation::Burn {
                caller: genesis,
                amount: U256::from(3u64),
            },
        )
        .unwrap();

        // Without --force the existing ledger is kept
        cmd_init(&data_dir, None, false).unwrap();
        assert_eq!(AppState::new(data_dir.clone()).unwrap().ledger.events().len(), 1);

        cmd_init(&data_dir, None, true).unwrap();
        let fresh = AppState::new(data_dir.clone()).unwrap();
        assert!(fresh.ledger.events().is_empty());
        assert!(fresh.storage.list_backups().is_empty());
    }

    #[test]
    fn test_state_requires_init() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(temp_dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_run_script() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");

        cmd_init(&data_dir, None, false).unwrap();
        let mut state = AppState::new(data_dir.clone()).unwrap();
        let genesis = GenesisConfig::default().genesis_account;
        let alice = Address::with_last_byte(2);
        let bob = Address::with_last_byte(3);

        let script = vec![
            Operation::Transfer {
                caller: genesis,
                to: alice,
                amount: U256::from(100u64),
            },
            Operation::Approve {
                caller: alice,
                spender: bob,
                amount: U256::from(50u64),
            },
            Operation::TransferFrom {
                caller: bob,
                from: alice,
                to: bob,
                amount: U256::from(60u64),
            },
            Operation::BurnFrom {
                caller: bob,
                from: alice,
                amount: U256::from(50u64),
            },
        ];
        let script_path = temp_dir.path().join("script.json");
        fs::write(&script_path, serde_json::to_string(&script).unwrap()).unwrap();

        cmd_run(&mut state, &script_path).unwrap();

        let reloaded = AppState::new(data_dir).unwrap();
        assert_eq!(reloaded.ledger.balance_of(&alice), U256::from(50u64));
        assert_eq!(reloaded.ledger.balance_of(&bob), U256::ZERO);
        assert_eq!(reloaded.ledger.allowance(&alice, &bob), U256::ZERO);
        assert_eq!(reloaded.ledger.events().len(), 2);
    }
}
