//! File-backed master data storage

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::StorageBackend;
use crate::error::{Error, Result};
use crate::models::{FileInfo, MasterDataFile};

/// Master data stored as pretty-printed JSON at a fixed path
///
/// Writes go to a temporary file in the same directory which then replaces
/// the target, so readers see either the old or the new document.
pub struct FileBackend {
    path: PathBuf,
    /// SHA-256 of the bytes last loaded or saved through this backend
    fingerprint: Mutex<Option<String>>,
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: Mutex::new(None),
        }
    }

    /// Get the master data file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Write `bytes` to `path` through a sibling temp file
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<Option<MasterDataFile>> {
        let Some(bytes) = self.read_bytes().await? else {
            *self.fingerprint.lock().await = None;
            debug!("No master data at {}", self.path.display());
            return Ok(None);
        };

        let file: MasterDataFile = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Persistence(format!("Invalid master data in {}: {}", self.path.display(), e))
        })?;

        *self.fingerprint.lock().await = Some(fingerprint(&bytes));
        debug!(
            "Loaded {} transactions from {}",
            file.transactions.len(),
            self.path.display()
        );
        Ok(Some(file))
    }

    async fn save(&self, file: &MasterDataFile) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(file)
            .map_err(|e| Error::Persistence(format!("Failed to serialize master data: {}", e)))?;
        let new_fingerprint = fingerprint(&bytes);

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| Error::Persistence(format!("Write task failed: {}", e)))?
            .map_err(|e| {
                Error::Persistence(format!("Failed to write {}: {}", self.path.display(), e))
            })?;

        *self.fingerprint.lock().await = Some(new_fingerprint);
        info!(
            "Saved {} transactions to {}",
            file.transactions.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn file_info(&self) -> Result<FileInfo> {
        let path = self.path.display().to_string();
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(FileInfo {
                path,
                exists: true,
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileInfo {
                path,
                exists: false,
                last_modified: None,
            }),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to stat {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn check_modified(&self) -> Result<bool> {
        let current = self.read_bytes().await?.map(|bytes| fingerprint(&bytes));
        let known = self.fingerprint.lock().await.clone();
        Ok(current != known)
    }
}
