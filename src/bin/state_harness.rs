//! Drives the wallet stores from a separate OS process.
//!
//! Used by the multi-process tests; stdout carries only machine-readable
//! results, logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ecash_wallet_state::security::key_provider::NotConfigured;
use ecash_wallet_state::security::redaction::redact_body;
use ecash_wallet_state::service::NoResolver;
use ecash_wallet_state::{Proof, WalletStateConfig, WalletStateEngine};

#[derive(Debug, Parser)]
#[command(name = "state_harness", about = "Wallet state store harness", disable_help_subcommand = true)]
struct Cli {
    /// Data directory holding the stores
    #[arg(long)]
    dir: PathBuf,

    /// Lock timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    lock_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reserve `count` indices `repeat` times; prints "start end" per range
    Reserve {
        #[arg(long)]
        keyset: String,
        #[arg(long, default_value_t = 1)]
        count: u64,
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },
    /// Add `count` proofs with secrets "<prefix>-<i>", one store call each
    AddProofs {
        #[arg(long)]
        mint: String,
        #[arg(long)]
        prefix: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long, default_value_t = 1)]
        amount: u64,
    },
    /// Print the stored balance for a mint
    Balance {
        #[arg(long)]
        mint: String,
    },
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = WalletStateConfig::in_dir(&cli.dir);
    config.lock.timeout_ms = cli.lock_timeout_ms;
    let engine = WalletStateEngine::open(config, Arc::new(NotConfigured), Arc::new(NoResolver))?;

    match cli.command {
        Commands::Reserve { keyset, count, repeat } => {
            for _ in 0..repeat {
                let range = engine.reserve_derivation_range(&keyset, count)?;
                println!("{} {}", range.start, range.end);
                // small jitter
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        Commands::AddProofs { mint, prefix, count, amount } => {
            for i in 0..count {
                let proof = Proof::new("009a1f293253e41e", amount, format!("{}-{}", prefix, i), "02");
                engine.apply_incoming(&mint, vec![proof])?;
            }
        }
        Commands::Balance { mint } => {
            println!("{}", engine.mint_state(&mint)?.balance);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("state_harness failed: {}", redact_body(&e.to_string()));
        std::process::exit(1);
    }
    Ok(())
}
