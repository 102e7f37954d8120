#![forbid(unsafe_code)]
//! Inspect a Sealchain ledger database

use clap::{Parser, Subcommand};
use colored::*;
use sealchain::blockchain::{Block, BlockRepository, Validator};
use sealchain::config::load_config;
use sealchain::crypto::Seal;
use sealchain::logging;
use sealchain::persistence::DbProvider;
use sealchain::transaction::Transaction;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "sealchain.toml")]
    config: String,
    /// Database path, overriding `database.path` from the config
    #[arg(long)]
    db: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shows the chain tip
    Last,
    /// Shows a block by height or seal
    Block {
        #[arg(long, conflicts_with = "seal", required_unless_present = "seal")]
        height: Option<u64>,
        /// Block seal as hex
        #[arg(long)]
        seal: Option<String>,
    },
    /// Shows the block that committed a transaction
    BlockOf { tx_id: String },
    /// Shows a committed transaction
    Tx { tx_id: String },
    /// Checks a committed transaction against its block's Merkle tree
    Verify { tx_id: String },
    /// Counts entries in every index
    Stats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(&config.logging)?;

    let db_path = cli.db.unwrap_or(config.database.path);
    let provider = Arc::new(DbProvider::open(&db_path)?);
    let repo = BlockRepository::new(provider, Some(Validator::new()))
        .with_durability(config.database.durable_writes);

    match cli.command {
        Commands::Last => match repo.get_last_block()? {
            Some(block) => print_block(&block),
            None => println!("{}", "Ledger is empty".yellow()),
        },
        Commands::Block { height, seal } => {
            let block = match (height, seal) {
                (Some(height), _) => repo.get_block_by_height(height)?,
                (None, Some(seal)) => repo.get_block_by_seal(&Seal::from_hex(&seal)?)?,
                (None, None) => return Err("either --height or --seal is required".into()),
            };
            print_block(&block);
        }
        Commands::BlockOf { tx_id } => print_block(&repo.get_block_by_tx_id(&tx_id)?),
        Commands::Tx { tx_id } => print_transaction(&repo.get_transaction_by_tx_id(&tx_id)?),
        Commands::Verify { tx_id } => {
            if repo.verify_transaction(&tx_id)? {
                println!("{} {}", "✓".green().bold(), format!("{} is sealed in its block", tx_id).green());
            } else {
                println!("{} {}", "✗".red().bold(), format!("{} failed the Merkle proof", tx_id).red());
                std::process::exit(1);
            }
        }
        Commands::Stats => {
            let stats = repo.stats()?;
            println!("{}", "Ledger statistics".bright_cyan().bold());
            println!("  {:<14} {}", "blocks", stats.blocks);
            println!("  {:<14} {}", "heights", stats.heights);
            println!("  {:<14} {}", "transactions", stats.transactions);
            println!("  {:<14} {}", "util entries", stats.util_entries);
            match repo.height()? {
                Some(height) => println!("  {:<14} {}", "tip height", height),
                None => println!("  {:<14} {}", "tip height", "-".dimmed()),
            }
        }
    }

    Ok(())
}

fn print_block(block: &Block) {
    println!("{}", format!("Block #{}", block.height).bright_cyan().bold());
    println!("  {:<10} {}", "seal", block.seal.to_hex().bright_yellow());
    let prev = block.prev_seal.as_ref().map(Seal::to_hex).unwrap_or_default();
    println!("  {:<10} {}", "prev", prev);
    let root = block.merkle_root().map(Seal::to_hex).unwrap_or_default();
    println!("  {:<10} {}", "root", root);
    println!("  {:<10} {}", "time", block.timestamp.to_rfc3339());
    println!("  {:<10} {}", "txs", block.tx_list.len());
    for tx in &block.tx_list {
        println!("    - {} {}", tx.id.bright_white(), tx.function.dimmed());
    }
}

fn print_transaction(tx: &Transaction) {
    println!("{}", format!("Transaction {}", tx.id).bright_cyan().bold());
    println!("  {:<10} {}", "type", tx.kind);
    println!("  {:<10} {}", "function", tx.function);
    println!("  {:<10} {}", "args", tx.args.join(", "));
    println!("  {:<10} {}", "time", tx.timestamp.to_rfc3339());
    println!("  {:<10} {}", "signature", hex::encode(&tx.signature));
}
