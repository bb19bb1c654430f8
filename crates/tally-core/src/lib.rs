//! Tally Core Library
//!
//! Shared functionality for the Tally transaction ledger:
//! - Master data document with derived metadata
//! - Pluggable storage backends (JSON file, in-memory key-value)
//! - Duplicate detection for incoming transactions
//! - Filtering, sorting and pagination of transaction lists
//! - Multi-stage import pipeline (mapping, preview, commit)
//! - Configuration from TOML and environment

pub mod config;
pub mod duplicates;
pub mod error;
pub mod import;
pub mod models;
pub mod query;
pub mod storage;
pub mod store;

/// Test utilities including a recording storage backend
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{Config, ListConfig, StorageConfig, StorageKind};
pub use duplicates::{find_duplicates, is_duplicate_transaction, DuplicateIndex};
pub use error::{Error, Result};
pub use import::{ImportDefaults, ImportPipeline, ImportStage, PreviewSummary, RawRow};
pub use models::{
    CanonicalField, ColumnMapping, CreateTransactionInput, FileInfo, MasterDataFile, Metadata,
    PreviewTransaction, Transaction, TransactionUpdate,
};
pub use query::{Page, SortDirection, SortField, SortSpec, TransactionFilters};
pub use storage::{open_backend, FileBackend, MemoryBackend, StorageBackend};
pub use store::TransactionStore;
