//! In-process key-value fallback storage

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::StorageBackend;
use crate::error::{Error, Result};
use crate::models::{FileInfo, MasterDataFile};

/// Key the master data document is stored under
pub const DEFAULT_STORAGE_KEY: &str = "master-data";

#[derive(Default)]
struct MemoryState {
    /// Serialized documents by key
    entries: HashMap<String, String>,
    /// Bumped on every write to the storage key
    revision: u64,
    /// Revision this backend last loaded or saved
    seen_revision: Option<u64>,
    last_modified: Option<DateTime<Utc>>,
}

/// Key-value store holding the document as a JSON string
///
/// Nothing survives the process; useful where no filesystem is available
/// and in tests.
pub struct MemoryBackend {
    key: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Raw stored value, if any
    pub async fn get_raw(&self) -> Option<String> {
        self.state.lock().await.entries.get(&self.key).cloned()
    }

    /// Overwrite the stored value as an outside writer would
    pub async fn put_raw(&self, value: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.entries.insert(self.key.clone(), value.into());
        state.revision += 1;
        state.last_modified = Some(Utc::now());
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Option<MasterDataFile>> {
        let mut state = self.state.lock().await;
        let Some(raw) = state.entries.get(&self.key).cloned() else {
            state.seen_revision = None;
            return Ok(None);
        };

        let file: MasterDataFile = serde_json::from_str(&raw).map_err(|e| {
            Error::Persistence(format!("Invalid master data under key {}: {}", self.key, e))
        })?;
        state.seen_revision = Some(state.revision);
        Ok(Some(file))
    }

    async fn save(&self, file: &MasterDataFile) -> Result<()> {
        let raw = serde_json::to_string(file)
            .map_err(|e| Error::Persistence(format!("Failed to serialize master data: {}", e)))?;

        let mut state = self.state.lock().await;
        state.entries.insert(self.key.clone(), raw);
        state.revision += 1;
        state.seen_revision = Some(state.revision);
        state.last_modified = Some(Utc::now());
        debug!(
            "Stored {} transactions under key {}",
            file.transactions.len(),
            self.key
        );
        Ok(())
    }

    async fn file_info(&self) -> Result<FileInfo> {
        let state = self.state.lock().await;
        Ok(FileInfo {
            path: format!("memory://{}", self.key),
            exists: state.entries.contains_key(&self.key),
            last_modified: state.last_modified,
        })
    }

    async fn check_modified(&self) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(match state.seen_revision {
            Some(seen) => seen != state.revision,
            None => state.entries.contains_key(&self.key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.load().await.unwrap().is_none());
        assert!(!backend.check_modified().await.unwrap());

        let info = backend.file_info().await.unwrap();
        assert_eq!(info.path, "memory://master-data");
        assert!(!info.exists);
    }

    #[tokio::test]
    async fn test_save_load_and_modification() {
        let backend = MemoryBackend::new();
        backend.save(&MasterDataFile::empty()).await.unwrap();
        assert!(!backend.check_modified().await.unwrap());
        assert!(backend.load().await.unwrap().is_some());

        let raw = backend.get_raw().await.unwrap();
        backend.put_raw(raw).await;
        assert!(backend.check_modified().await.unwrap());

        backend.load().await.unwrap();
        assert!(!backend.check_modified().await.unwrap());
    }

    #[tokio::test]
    async fn test_garbage_value_is_persistence_error() {
        let backend = MemoryBackend::with_key("ledger");
        backend.put_raw("not json").await;
        assert!(matches!(
            backend.load().await,
            Err(Error::Persistence(_))
        ));
    }
}
