//! Saved-map history: at most `MAX_COMPOSITIONS` entries, newest first,
//! each kept for `RETENTION_DAYS`. The whole collection lives as one JSON
//! array under a single storage key.
//!
//! Operations never fail from the caller's point of view. Storage or parse
//! errors are logged and degrade to an empty read or a skipped write.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::constants::{MAX_COMPOSITIONS, RETENTION_DAYS, STORAGE_KEY, STORAGE_SOFT_LIMIT_BYTES};
use crate::error::StorageError;
use crate::models::SavedComposition;

pub mod storage;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Diagnostics about the stored collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub used_bytes: u64,
    pub max_bytes: u64,
    pub count: usize,
}

pub struct CompositionStore<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    capacity: usize,
    retention_ms: i64,
    // serializes read-modify-write cycles
    write_lock: Mutex<()>,
    reflection: watch::Sender<Vec<SavedComposition>>,
}

impl<S: KeyValueStorage> CompositionStore<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        let (reflection, _) = watch::channel(Vec::new());
        CompositionStore {
            storage,
            clock,
            capacity: MAX_COMPOSITIONS,
            retention_ms: RETENTION_DAYS * DAY_MS,
            write_lock: Mutex::new(()),
            reflection,
        }
    }

    /// Observers receive the collection after every mutation
    pub fn subscribe(&self) -> watch::Receiver<Vec<SavedComposition>> {
        self.reflection.subscribe()
    }

    /// Last collection published to observers
    pub fn current(&self) -> Vec<SavedComposition> {
        self.reflection.borrow().clone()
    }

    /// Inserts `composition` as the most recent entry, replacing any entry with
    /// the same id, then evicts the oldest entries beyond capacity.
    pub fn save(&self, composition: SavedComposition) {
        let _guard = self.lock();
        let id = composition.id.clone();
        match self.try_save(composition) {
            Ok(saved) => {
                info!(id = %id, count = saved.len(), "Map saved");
                self.publish(saved);
            }
            Err(e) => error!(operation = "save", id = %id, error = %e, "Failed to save map"),
        }
    }

    fn try_save(&self, mut composition: SavedComposition) -> Result<Vec<SavedComposition>, StorageError> {
        let mut saved = self.read()?;
        if let Some(existing) = saved.iter().find(|m| m.id == composition.id) {
            composition.created_at = existing.created_at;
        }
        saved.retain(|m| m.id != composition.id);
        saved.insert(0, composition);
        if saved.len() > self.capacity {
            debug!(evicted = saved.len() - self.capacity, "Evicting oldest saved maps");
            saved.truncate(self.capacity);
        }
        self.write(&saved)?;
        Ok(saved)
    }

    /// All unexpired entries, newest first by creation time.
    /// Expired entries are dropped from storage as a side effect.
    pub fn load_all(&self) -> Vec<SavedComposition> {
        let _guard = self.lock();
        match self.try_load_all() {
            Ok(valid) => {
                self.publish(valid.clone());
                valid
            }
            Err(e) => {
                error!(operation = "load_all", error = %e, "Failed to load saved maps");
                Vec::new()
            }
        }
    }

    fn try_load_all(&self) -> Result<Vec<SavedComposition>, StorageError> {
        let saved = self.read()?;
        let now = self.clock.now_millis();
        let total = saved.len();

        let mut valid: Vec<SavedComposition> = saved
            .into_iter()
            .filter(|m| now.saturating_sub(m.created_at) < self.retention_ms)
            .collect();

        if valid.len() < total {
            info!(expired = total - valid.len(), "Dropping expired saved maps");
            if let Err(e) = self.write(&valid) {
                error!(operation = "load_all", error = %e, "Failed to rewrite saved maps after expiry");
            }
        }

        valid.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(valid)
    }

    /// Removes the entry with `id`; absent ids are ignored
    pub fn delete(&self, id: &str) {
        let _guard = self.lock();
        let result = self.read().and_then(|mut saved| {
            let before = saved.len();
            saved.retain(|m| m.id != id);
            if saved.len() == before {
                return Ok(None);
            }
            self.write(&saved)?;
            Ok(Some(saved))
        });

        match result {
            Ok(Some(saved)) => {
                info!(id = %id, "Map deleted");
                self.publish(saved);
            }
            Ok(None) => debug!(id = %id, "Delete ignored, no such map"),
            Err(e) => error!(operation = "delete", id = %id, error = %e, "Failed to delete map"),
        }
    }

    /// Changes only the name of the entry with `id`; absent ids are ignored
    pub fn rename(&self, id: &str, new_name: &str) {
        let _guard = self.lock();
        let result = self.read().and_then(|mut saved| {
            let Some(entry) = saved.iter_mut().find(|m| m.id == id) else {
                return Ok(None);
            };
            entry.name = new_name.to_string();
            self.write(&saved)?;
            Ok(Some(saved))
        });

        match result {
            Ok(Some(saved)) => {
                info!(id = %id, name = %new_name, "Map renamed");
                self.publish(saved);
            }
            Ok(None) => debug!(id = %id, "Rename ignored, no such map"),
            Err(e) => error!(operation = "rename", id = %id, error = %e, "Failed to rename map"),
        }
    }

    /// Removes every saved map
    pub fn clear(&self) {
        let _guard = self.lock();
        match self.storage.remove(STORAGE_KEY) {
            Ok(()) => {
                info!("All saved maps cleared");
                self.publish(Vec::new());
            }
            Err(e) => error!(operation = "clear", error = %e, "Failed to clear saved maps"),
        }
    }

    pub fn storage_info(&self) -> StorageInfo {
        let empty = StorageInfo {
            used_bytes: 0,
            max_bytes: STORAGE_SOFT_LIMIT_BYTES,
            count: 0,
        };
        let data = match self.storage.get(STORAGE_KEY) {
            Ok(data) => data.unwrap_or_else(|| "[]".to_string()),
            Err(e) => {
                error!(operation = "storage_info", error = %e, "Failed to read storage info");
                return empty;
            }
        };
        match serde_json::from_str::<Vec<SavedComposition>>(&data) {
            Ok(saved) => StorageInfo {
                used_bytes: data.len() as u64,
                count: saved.len(),
                ..empty
            },
            Err(e) => {
                error!(operation = "storage_info", error = %e, "Failed to read storage info");
                empty
            }
        }
    }

    fn read(&self) -> Result<Vec<SavedComposition>, StorageError> {
        match self.storage.get(STORAGE_KEY)? {
            Some(data) => serde_json::from_str(&data).map_err(StorageError::Corrupt),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, saved: &[SavedComposition]) -> Result<(), StorageError> {
        let data = serde_json::to_string(saved).map_err(StorageError::Encode)?;
        self.storage.set(STORAGE_KEY, &data)
    }

    fn publish(&self, saved: Vec<SavedComposition>) {
        self.reflection.send_replace(saved);
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
