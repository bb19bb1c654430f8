//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `load_config` - Resolve configuration with CLI overrides
//! - `open_store` - Shared utility to open the transaction store
//! - `cmd_init` - Create an empty master data file
//! - `cmd_info` - Show storage details and the ledger summary

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{open_backend, Config, MasterDataFile, StorageKind, TransactionStore};

/// Load config from file and environment, then apply `--data`
pub fn load_config(config_path: Option<&Path>, data_override: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if let Some(path) = data_override {
        config.storage.backend = StorageKind::File;
        config.storage.path = path.to_path_buf();
    }
    Ok(config)
}

/// Open the store on the configured backend
pub fn open_store(config: &Config) -> TransactionStore {
    TransactionStore::new(open_backend(config))
}

pub async fn cmd_init(store: &TransactionStore) -> Result<()> {
    let info = store.file_info().await?;
    println!("🔧 Initializing ledger at {}...", info.path);

    if info.exists {
        println!("   Master data already exists, leaving it untouched");
        return Ok(());
    }

    let mut file = MasterDataFile::empty();
    store
        .save_master_data(&mut file)
        .await
        .context("Failed to write master data")?;

    println!("✅ Ledger initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: tally import --file statement.csv");
    println!("  2. Browse them: tally list --sort date --desc");

    Ok(())
}

pub async fn cmd_info(store: &TransactionStore) -> Result<()> {
    let file = store.load_master_data().await;
    let info = store.file_info().await?;
    let modified = store.check_modified().await?;

    println!();
    println!("📒 Tally Ledger ({} backend)", store.backend().name());
    println!("   ─────────────────────────────");
    println!("   Location:      {}", info.path);
    println!(
        "   Exists:        {}",
        if info.exists { "yes" } else { "no" }
    );
    if let Some(last_modified) = info.last_modified {
        println!(
            "   Last modified: {}",
            last_modified.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if modified {
        println!("   ⚠️  Changed by another writer while reading");
    }

    let metadata = &file.metadata;
    println!();
    println!("   Version:       {}", file.version);
    println!("   Transactions:  {}", metadata.total_transactions);
    match (metadata.date_range.earliest, metadata.date_range.latest) {
        (Some(earliest), Some(latest)) => {
            println!("   Date range:    {} to {}", earliest, latest)
        }
        _ => println!("   Date range:    (none)"),
    }
    if metadata.accounts.is_empty() {
        println!("   Accounts:      (none)");
    } else {
        println!("   Accounts:      {}", metadata.accounts.join(", "));
    }

    Ok(())
}
