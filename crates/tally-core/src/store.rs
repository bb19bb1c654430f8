//! Transaction store over an injected storage backend
//!
//! Every mutating operation loads the whole master data document, changes
//! it in memory and writes it back with a single `save`. There is no
//! locking: two writers racing on the same backend lose one writer's
//! changes (last write wins).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    CreateTransactionInput, FileInfo, MasterDataFile, Transaction, TransactionUpdate,
};
use crate::storage::StorageBackend;

/// Versioned transaction collection with derived metadata
#[derive(Clone)]
pub struct TransactionStore {
    backend: Arc<dyn StorageBackend>,
}

impl TransactionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// The backend this store persists through
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Load the persisted document
    ///
    /// Falls back to a fresh empty document when nothing is stored or the
    /// stored document cannot be read.
    pub async fn load_master_data(&self) -> MasterDataFile {
        match self.backend.load().await {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!("No master data stored yet, starting empty");
                MasterDataFile::empty()
            }
            Err(e) => {
                warn!("Failed to load master data, starting empty: {}", e);
                MasterDataFile::empty()
            }
        }
    }

    /// Load the document a write will replace
    ///
    /// Unlike [`Self::load_master_data`] a failed load is an error, so a
    /// write never overwrites a ledger it could not read.
    async fn load_for_write(&self) -> Result<MasterDataFile> {
        match self.backend.load().await {
            Ok(Some(file)) => Ok(file),
            Ok(None) => Ok(MasterDataFile::empty()),
            Err(e) => {
                warn!("Refusing to write after failed load: {}", e);
                Err(Error::Persistence(format!("Failed to load master data: {}", e)))
            }
        }
    }

    /// Every transaction, failing when the stored document cannot be read
    pub async fn try_list_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.load_for_write().await?.transactions)
    }

    /// Recompute metadata, stamp the update time, and persist
    ///
    /// This is the only path that changes metadata, so it always matches
    /// the transactions it summarizes.
    pub async fn save_master_data(&self, file: &mut MasterDataFile) -> Result<()> {
        file.refresh();
        self.backend.save(file).await
    }

    /// All transactions in insertion order
    pub async fn list_transactions(&self) -> Vec<Transaction> {
        self.load_master_data().await.transactions
    }

    pub async fn get_transaction(&self, id: &str) -> Option<Transaction> {
        self.load_master_data()
            .await
            .transactions
            .into_iter()
            .find(|tx| tx.id == id)
    }

    /// Append new transactions with fresh ids and one save
    pub async fn add_transactions(
        &self,
        inputs: Vec<CreateTransactionInput>,
    ) -> Result<Vec<Transaction>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        for input in &inputs {
            check_amount(input.amount)?;
        }

        let mut file = self.load_for_write().await?;
        let imported_at = Utc::now();
        let created: Vec<Transaction> = inputs
            .into_iter()
            .map(|input| Transaction::from_input(input, Uuid::new_v4().to_string(), imported_at))
            .collect();

        file.transactions.extend(created.iter().cloned());
        self.save_master_data(&mut file).await?;

        info!("Added {} transactions", created.len());
        Ok(created)
    }

    /// Merge fields onto an existing transaction
    pub async fn update_transaction(
        &self,
        id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        if let Some(amount) = update.amount {
            check_amount(amount)?;
        }

        let mut file = self.load_for_write().await?;
        let tx = file
            .transactions
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;

        tx.apply(update);
        let updated = tx.clone();
        self.save_master_data(&mut file).await?;

        debug!("Updated transaction {}", id);
        Ok(updated)
    }

    /// Remove one transaction; unknown ids are an error
    pub async fn delete_transaction(&self, id: &str) -> Result<()> {
        let mut file = self.load_for_write().await?;
        let position = file
            .transactions
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))?;

        file.transactions.remove(position);
        self.save_master_data(&mut file).await?;

        debug!("Deleted transaction {}", id);
        Ok(())
    }

    /// Remove every listed transaction; unknown ids are ignored
    ///
    /// Unlike [`Self::delete_transaction`] this never reports a missing id.
    /// Returns how many records were removed.
    pub async fn delete_transactions(&self, ids: &[String]) -> Result<usize> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut file = self.load_for_write().await?;
        let before = file.transactions.len();
        file.transactions.retain(|tx| !wanted.contains(tx.id.as_str()));
        let removed = before - file.transactions.len();

        if removed > 0 {
            self.save_master_data(&mut file).await?;
        }

        debug!("Deleted {} of {} requested transactions", removed, ids.len());
        Ok(removed)
    }

    pub async fn file_info(&self) -> Result<FileInfo> {
        self.backend.file_info().await
    }

    pub async fn check_modified(&self) -> Result<bool> {
        self.backend.check_modified().await
    }
}

/// JSON has no representation for NaN or infinity
fn check_amount(amount: f64) -> Result<()> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(Error::Validation(format!("Amount must be a finite number, got {}", amount)))
    }
}
