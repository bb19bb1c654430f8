//! Test utilities: a recording storage backend and transaction builders
//!
//! Enabled for unit tests and, through the `test-utils` feature, for other
//! crates' tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::models::{CreateTransactionInput, FileInfo, MasterDataFile, Transaction};
use crate::storage::{MemoryBackend, StorageBackend};

/// Institution used by the builders
pub const TEST_INSTITUTION: &str = "Test Bank";
/// Account used by the builders
pub const TEST_ACCOUNT: &str = "Checking";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test dates are YYYY-MM-DD")
}

/// Import input whose merchant and original statement are both `statement`
pub fn input(day: &str, statement: &str, amount: f64) -> CreateTransactionInput {
    let mut input = CreateTransactionInput::new(date(day), statement, amount);
    input.institution_name = TEST_INSTITUTION.to_string();
    input.account_name = TEST_ACCOUNT.to_string();
    input.original_statement = statement.to_string();
    input
}

/// Stored transaction matching [`input`] for the same arguments
pub fn existing_tx(id: &str, day: &str, statement: &str, amount: f64) -> Transaction {
    Transaction::from_input(input(day, statement, amount), id.to_string(), Utc::now())
}

/// Memory-backed storage that counts calls and can be told to fail
#[derive(Default)]
pub struct RecordingBackend {
    inner: MemoryBackend,
    loads: AtomicUsize,
    saves: AtomicUsize,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Successful and failed saves alike
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn load(&self) -> Result<Option<MasterDataFile>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Error::Persistence("simulated load failure".into()));
        }
        self.inner.load().await
    }

    async fn save(&self, file: &MasterDataFile) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Persistence("simulated save failure".into()));
        }
        self.inner.save(file).await
    }

    async fn file_info(&self) -> Result<FileInfo> {
        self.inner.file_info().await
    }

    async fn check_modified(&self) -> Result<bool> {
        self.inner.check_modified().await
    }
}
