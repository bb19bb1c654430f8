//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Tally - Keep one clean ledger of every transaction
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Personal transaction ledger with CSV import", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <data dir>/tally/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Master data file, overriding the configured path
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty master data file
    Init,

    /// Show storage location and ledger summary
    Info,

    /// Import transactions from CSV
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Map a column to a field, e.g. --map "Post Date=date"
        #[arg(long = "map", value_name = "COLUMN=FIELD")]
        mappings: Vec<String>,

        /// Leave a column unmapped
        #[arg(long = "unmap", value_name = "COLUMN")]
        unmapped: Vec<String>,

        /// Institution for rows without a mapped institution column
        #[arg(long)]
        institution: Option<String>,

        /// Account for rows without a mapped account column
        #[arg(short, long)]
        account: Option<String>,

        /// Also import rows flagged as duplicates
        #[arg(long)]
        include_duplicates: bool,

        /// Show the preview without saving anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List transactions
    List(ListArgs),

    /// Add a transaction by hand
    Add {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        #[arg(long)]
        merchant: String,

        /// Negative for debits
        #[arg(long, allow_hyphen_values = true, value_parser = parse_finite_amount)]
        amount: f64,

        #[command(flatten)]
        fields: OptionalFields,
    },

    /// Update fields of a transaction
    Update {
        /// Transaction ID
        id: String,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        merchant: Option<String>,

        #[arg(long, allow_hyphen_values = true, value_parser = parse_finite_amount)]
        amount: Option<f64>,

        #[command(flatten)]
        fields: OptionalFields,
    },

    /// Delete transactions by ID
    Delete {
        /// One or more transaction IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Optional transaction fields shared by add and update
#[derive(Args, Default)]
pub struct OptionalFields {
    #[arg(long)]
    pub institution: Option<String>,

    #[arg(long)]
    pub account: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Original statement text
    #[arg(long)]
    pub statement: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Earliest date (inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest date (inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub institution: Option<String>,

    #[arg(long)]
    pub account: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Minimum amount (inclusive)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_finite_amount)]
    pub min: Option<f64>,

    /// Maximum amount (inclusive)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_finite_amount)]
    pub max: Option<f64>,

    #[arg(long)]
    pub tag: Option<String>,

    /// Text to find in merchant, statement or notes
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort field: date, merchant, amount, category, institution, account, ...
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Parse an amount, refusing NaN and infinities
pub fn parse_finite_amount(s: &str) -> Result<f64, String> {
    let amount: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(format!("'{}' is not a finite amount", s))
    }
}
