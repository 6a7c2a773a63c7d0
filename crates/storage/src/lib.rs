//! Durable snapshot storage for the upload queue.
//!
//! The full queue is written as one versioned JSON envelope. Writes land in
//! a sibling temp file and are renamed into place, so a crash mid-write never
//! leaves a truncated snapshot behind. A snapshot with an unknown version is
//! destructively reset to an empty queue rather than crashing the caller.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use uplink_types::{PersistedQueue, QueueItem, SNAPSHOT_VERSION};

/// Errors from snapshot load/save/clear operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed queue snapshot store.
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    /// Creates a store writing to `path`. The file and its parent directories
    /// are created lazily on first save.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted items.
    ///
    /// A missing file yields an empty queue. A snapshot whose version is not
    /// [`SNAPSHOT_VERSION`] is deleted and yields an empty queue.
    pub fn load(&self) -> Result<Vec<QueueItem>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let value: serde_json::Value = serde_json::from_str(&data)?;

        // Probe the version before decoding items, since unknown versions may
        // carry an incompatible item schema.
        let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version != SNAPSHOT_VERSION {
            warn!(
                found = version,
                expected = SNAPSHOT_VERSION,
                "unknown queue snapshot version, resetting to empty"
            );
            self.clear()?;
            return Ok(Vec::new());
        }

        let envelope: PersistedQueue = serde_json::from_value(value)?;
        debug!(items = envelope.items.len(), path = ?self.path, "loaded queue snapshot");
        Ok(envelope.items)
    }

    /// Writes the full item set as a versioned envelope, atomically.
    pub fn save(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        let envelope = PersistedQueue {
            version: SNAPSHOT_VERSION,
            items: items.to_vec(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(items = items.len(), path = ?self.path, "persisted queue snapshot");
        Ok(())
    }

    /// Removes the snapshot file if present.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
