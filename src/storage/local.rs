//! Local filesystem storage implementation.
//!
//! Writes go to a temporary file that is renamed into place, so a crash
//! leaves either the old or the new snapshot, never a truncated one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{Entity, SnapshotStorage, Slot};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read JSON data, falling back to `T::default()` when the file is
    /// missing, blank, or unparsable.
    pub async fn read_json_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let bytes = match self.read_bytes(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return T::default(),
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                return T::default();
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return T::default();
        }
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            log::warn!("Ignoring unparsable {}: {}", key, e);
            T::default()
        })
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn archive(&self, entity: &Entity) -> Result<bool> {
        let current = entity.key(Slot::Current);
        match self.read_bytes(&current).await? {
            Some(bytes) => {
                self.write_bytes(&entity.key(Slot::Previous), &bytes).await?;
                log::debug!("Archived {} ({} bytes)", current, bytes.len());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn write_snapshot(&self, entity: &Entity, value: &Value) -> Result<()> {
        self.write_json(&entity.key(Slot::Current), value).await
    }

    async fn load_snapshot(&self, entity: &Entity, slot: Slot) -> Result<Value> {
        let key = entity.key(slot);
        let bytes = self
            .read_bytes(&key)
            .await?
            .ok_or_else(|| AppError::invalid_snapshot(&key, "file not found"))?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::invalid_snapshot(&key, e))
    }

    async fn fingerprint(&self, entity: &Entity, slot: Slot) -> Result<Option<String>> {
        Ok(self
            .read_bytes(&entity.key(slot))
            .await?
            .map(|bytes| hex::encode(Sha256::digest(&bytes))))
    }

    async fn write_artifact(&self, key: &str, value: &Value) -> Result<()> {
        self.write_json(key, value).await
    }
}

/// Load a JSON file that must exist and parse.
pub async fn load_json_file(path: &Path) -> Result<Value> {
    let name = path.display().to_string();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::invalid_snapshot(name, "file not found"));
        }
        Err(e) => return Err(AppError::Io(e)),
    };
    serde_json::from_slice(&bytes).map_err(|e| AppError::invalid_snapshot(name, e))
}
