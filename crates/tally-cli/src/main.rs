//! Tally CLI - Personal transaction ledger
//!
//! Usage:
//!   tally init                 Create an empty master data file
//!   tally import --file CSV    Import transactions (columns auto-mapped)
//!   tally list --sort amount   List, filter and sort transactions
//!   tally delete ID...         Remove transactions

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.data.as_deref())?;
    let store = commands::open_store(&config);

    match cli.command {
        Commands::Init => commands::cmd_init(&store).await,
        Commands::Info => commands::cmd_info(&store).await,
        Commands::Import {
            file,
            mappings,
            unmapped,
            institution,
            account,
            include_duplicates,
            dry_run,
            yes,
        } => {
            let options = commands::ImportOptions {
                mappings,
                unmapped,
                institution,
                account,
                include_duplicates,
                dry_run,
                yes,
            };
            commands::cmd_import(&store, &file, &options).await
        }
        Commands::List(args) => commands::cmd_list(&store, &args, config.list.page_size).await,
        Commands::Add {
            date,
            merchant,
            amount,
            fields,
        } => {
            let input = commands::build_input(date, merchant, amount, fields);
            commands::cmd_add(&store, input).await
        }
        Commands::Update {
            id,
            date,
            merchant,
            amount,
            fields,
        } => {
            let update = commands::build_update(date, merchant, amount, fields);
            commands::cmd_update(&store, &id, update).await
        }
        Commands::Delete { ids } => commands::cmd_delete(&store, &ids).await,
    }
}
