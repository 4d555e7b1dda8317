//! Process-local storage backed by a concurrent map.

use dashmap::DashMap;
use rpg_value::StorageError;

use super::{MemorySliceId, MemorySliceStorage, SliceValues};

/// Slices kept in memory for the life of the process.
///
/// Writes apply immediately; the transaction calls are accepted and
/// ignored. Safe for concurrent executions working on distinct ids.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    slices: DashMap<MemorySliceId, SliceValues>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored values for `id`; `None` when no slice exists.
    pub fn get(&self, id: &MemorySliceId) -> Option<SliceValues> {
        self.slices.get(id).map(|entry| entry.value().clone())
    }

    /// Seed a slice, as if an earlier execution had stored it.
    pub fn insert(&self, id: MemorySliceId, values: SliceValues) {
        self.slices.insert(id, values);
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

impl MemorySliceStorage for InMemoryStorage {
    fn open(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn load(&self, id: &MemorySliceId) -> Result<SliceValues, StorageError> {
        Ok(self.get(id).unwrap_or_default())
    }

    fn begin_trans(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn store(&self, id: &MemorySliceId, values: SliceValues) -> Result<(), StorageError> {
        if values.is_empty() {
            self.slices.remove(id);
        } else {
            self.slices.insert(id.clone(), values);
        }
        Ok(())
    }

    fn commit_trans(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn rollback_trans(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
