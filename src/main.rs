//! Token Ledger CLI Application
//!
//! A command-line interface for operating a token ledger.

use alloy_primitives::{Address, Bytes, U256};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use token_ledger::cli::{self, AppState};
use token_ledger::token::{parse_address, parse_amount, Operation};

#[derive(Parser)]
#[command(name = "token-ledger")]
#[command(version = "0.1.0")]
#[command(about = "A fungible token ledger with allowances, burns and an event log", long_about = None)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger at genesis
    Init {
        /// Genesis configuration file (JSON)
        #[arg(short, long)]
        genesis: Option<PathBuf>,

        /// Overwrite an existing ledger
        #[arg(long)]
        force: bool,
    },

    /// Display token information
    Info,

    /// Show an account's balance
    Balance {
        #[arg(value_parser = parse_address)]
        account: Address,
    },

    /// Show how much a spender may use on an owner's behalf
    Allowance {
        #[arg(short, long, value_parser = parse_address)]
        owner: Address,

        #[arg(short, long, value_parser = parse_address)]
        spender: Address,
    },

    /// Move tokens from the caller to a recipient
    Transfer {
        /// Submitting account
        #[arg(short, long, value_parser = parse_address)]
        caller: Address,

        #[arg(short, long, value_parser = parse_address)]
        to: Address,

        /// Amount in base units (decimal or 0x-hex)
        #[arg(short, long, value_parser = parse_amount)]
        amount: U256,
    },

    /// Set a spender's allowance over the caller's tokens
    Approve {
        #[arg(short, long, value_parser = parse_address)]
        caller: Address,

        #[arg(short, long, value_parser = parse_address)]
        spender: Address,

        #[arg(short, long, value_parser = parse_amount)]
        amount: U256,
    },

    /// Move tokens out of an owner's balance using an allowance
    TransferFrom {
        /// Spender submitting the operation
        #[arg(short, long, value_parser = parse_address)]
        caller: Address,

        #[arg(short, long, value_parser = parse_address)]
        from: Address,

        #[arg(short, long, value_parser = parse_address)]
        to: Address,

        #[arg(short, long, value_parser = parse_amount)]
        amount: U256,
    },

    /// Destroy tokens from the caller's balance
    Burn {
        #[arg(short, long, value_parser = parse_address)]
        caller: Address,

        #[arg(short, long, value_parser = parse_amount)]
        amount: U256,
    },

    /// Destroy tokens from an owner's balance using an allowance
    BurnFrom {
        #[arg(short, long, value_parser = parse_address)]
        caller: Address,

        #[arg(short, long, value_parser = parse_address)]
        from: Address,

        #[arg(short, long, value_parser = parse_amount)]
        amount: U256,
    },

    /// Approve a spender and notify it in the same step
    ApproveAndCall {
        #[arg(short, long, value_parser = parse_address)]
        caller: Address,

        #[arg(short, long, value_parser = parse_address)]
        spender: Address,

        #[arg(short, long, value_parser = parse_amount)]
        amount: U256,

        /// Extra data passed to the spender (hex)
        #[arg(long, value_parser = parse_extra_data, default_value = "")]
        data: Bytes,
    },

    /// Apply a JSON array of operations in order
    Run {
        /// Script file path
        #[arg(short, long)]
        script: PathBuf,
    },

    /// List recorded events
    Events {
        /// First sequence number to show
        #[arg(short, long, default_value = "0")]
        since: u64,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check invariants and replay the event log
    Verify,

    /// Export the ledger snapshot to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a ledger snapshot from a file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn parse_extra_data(input: &str) -> Result<Bytes, hex::FromHexError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(Bytes::from(hex::decode(digits)?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init command separately (doesn't need existing state)
    if let Commands::Init { genesis, force } = &cli.command {
        return cli::cmd_init(&cli.data_dir, genesis.as_deref(), *force);
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Info => {
            cli::cmd_info(&state)?;
        }

        Commands::Balance { account } => {
            cli::cmd_balance(&state, &account)?;
        }

        Commands::Allowance { owner, spender } => {
            cli::cmd_allowance(&state, &owner, &spender)?;
        }

        Commands::Transfer { caller, to, amount } => {
            cli::cmd_submit(&mut state, &Operation::Transfer { caller, to, amount })?;
        }

        Commands::Approve {
            caller,
            spender,
            amount,
        } => {
            cli::cmd_submit(
                &mut state,
                &Operation::Approve {
                    caller,
                    spender,
                    amount,
                },
            )?;
        }

        Commands::TransferFrom {
            caller,
            from,
            to,
            amount,
        } => {
            cli::cmd_submit(
                &mut state,
                &Operation::TransferFrom {
                    caller,
                    from,
                    to,
                    amount,
                },
            )?;
        }

        Commands::Burn { caller, amount } => {
            cli::cmd_submit(&mut state, &Operation::Burn { caller, amount })?;
        }

        Commands::BurnFrom {
            caller,
            from,
            amount,
        } => {
            cli::cmd_submit(
                &mut state,
                &Operation::BurnFrom {
                    caller,
                    from,
                    amount,
                },
            )?;
        }

        Commands::ApproveAndCall {
            caller,
            spender,
            amount,
            data,
        } => {
            cli::cmd_submit(
                &mut state,
                &Operation::ApproveAndCall {
                    caller,
                    spender,
                    amount,
                    extra_data: data,
                },
            )?;
        }

        Commands::Run { script } => {
            cli::cmd_run(&mut state, &script)?;
        }

        Commands::Events { since, json } => {
            cli::cmd_events(&state, since, json)?;
        }

        Commands::Verify => {
            cli::cmd_verify(&state)?;
        }

        Commands::Export { output } => {
            cli::cmd_export(&state, &output)?;
        }

        Commands::Import { input } => {
            cli::cmd_import(&mut state, &input)?;
        }
    }

    Ok(())
}
