//! Persistence backends for the master data document
//!
//! # Architecture
//!
//! - `StorageBackend` trait defines the interface the transaction store is
//!   injected with
//! - `FileBackend` keeps the document as JSON on disk
//! - `MemoryBackend` is the simple key-value fallback
//!
//! The backend is chosen once at startup (see [`open_backend`]) and shared
//! by reference, so call sites never ask which environment they run in.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, StorageKind};
use crate::error::Result;
use crate::models::{FileInfo, MasterDataFile};

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::{MemoryBackend, DEFAULT_STORAGE_KEY};

/// Trait for master data storage
///
/// Every method is a single asynchronous step that either completes or fails
/// with [`crate::Error::Persistence`]. Implementations never retry.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for this backend
    fn name(&self) -> &str;

    /// Read the stored document, or `None` when nothing has been stored yet
    async fn load(&self) -> Result<Option<MasterDataFile>>;

    /// Replace the stored document
    async fn save(&self, file: &MasterDataFile) -> Result<()>;

    /// Where the document lives and when it last changed
    async fn file_info(&self) -> Result<FileInfo>;

    /// Whether the stored document changed since this backend last loaded
    /// or saved it
    async fn check_modified(&self) -> Result<bool>;
}

/// Build the backend selected by configuration
pub fn open_backend(config: &Config) -> Arc<dyn StorageBackend> {
    match config.storage.backend {
        StorageKind::File => Arc::new(FileBackend::new(config.storage.path.clone())),
        StorageKind::Memory => Arc::new(MemoryBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_backend_follows_config() {
        let mut config = Config::default();
        assert_eq!(open_backend(&config).name(), "file");

        config.storage.backend = StorageKind::Memory;
        assert_eq!(open_backend(&config).name(), "memory");
    }
}
