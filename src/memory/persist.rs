//! Memory persistence backends
//!
//! The store always snapshots its whole map. Backends only move a
//! [`MemorySnapshot`] to and from durable storage.

use super::types::MemorySnapshot;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Durable storage for memory snapshots
#[async_trait]
pub trait MemoryPersistence: Send + Sync {
    /// Read the last saved snapshot. A backend with nothing saved yet
    /// returns an empty snapshot; unreadable data is an error.
    async fn load(&self) -> Result<MemorySnapshot>;

    /// Replace the saved snapshot
    async fn save(&self, snapshot: &MemorySnapshot) -> Result<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Snapshot stored as a single JSON file
pub struct JsonFilePersistence {
    path: PathBuf,
    /// Single writer at a time
    write_lock: Mutex<()>,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MemoryPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<MemorySnapshot> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MemorySnapshot::new())
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_str(&data)?;
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &MemorySnapshot) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string(snapshot)?;

        // Write to a sibling temp file, then rename over the target
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::Memory(format!(
                "Failed to move {} into place: {}",
                temp_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Ephemeral backend: loads nothing, saves nowhere
#[derive(Debug, Default)]
pub struct NullPersistence;

#[async_trait]
impl MemoryPersistence for NullPersistence {
    async fn load(&self) -> Result<MemorySnapshot> {
        Ok(MemorySnapshot::new())
    }

    async fn save(&self, _snapshot: &MemorySnapshot) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
