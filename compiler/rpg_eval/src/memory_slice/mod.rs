//! Memory slices: program state retained across calls.
//!
//! A slice is the name-to-value map of one program's variables, keyed by
//! [`MemorySliceId`] (activation group + program). The [`MemorySliceMgr`]
//! owned by an execution context decides what is written back to the
//! configured [`MemorySliceStorage`]:
//!
//! ```text
//! open → load* → (program runs) → retain | discard
//!      → after_main_program_interpretation(success)
//!          success: begin_trans → store* → commit_trans (rollback_trans on failure)
//!      → close
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rpg_value::{EvalError, StorageError, Value};
use rustc_hash::FxHashMap;

mod file;
mod in_memory;

pub use file::FileStorage;
pub use in_memory::InMemoryStorage;

/// Variable name to value, as persisted.
pub type SliceValues = FxHashMap<String, Value>;

/// Identity of a memory slice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemorySliceId {
    pub activation_group: String,
    pub program_name: String,
}

impl MemorySliceId {
    pub fn new(activation_group: impl Into<String>, program_name: impl Into<String>) -> Self {
        Self {
            activation_group: activation_group.into(),
            program_name: program_name.into(),
        }
    }
}

impl fmt::Display for MemorySliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.activation_group, self.program_name)
    }
}

/// Pluggable persistence for memory slices.
///
/// One storage may be shared by concurrent executions; each works on its
/// own ids. Every method may fail, and failures reach the caller of
/// `execute` unchanged.
pub trait MemorySliceStorage: Send + Sync {
    fn open(&self) -> Result<(), StorageError>;

    /// Stored values for `id`, or an empty map.
    fn load(&self, id: &MemorySliceId) -> Result<SliceValues, StorageError>;

    fn begin_trans(&self) -> Result<(), StorageError>;

    /// Replace the slice for `id`. An empty map removes it.
    fn store(&self, id: &MemorySliceId, values: SliceValues) -> Result<(), StorageError>;

    fn commit_trans(&self) -> Result<(), StorageError>;

    fn rollback_trans(&self) -> Result<(), StorageError>;

    fn close(&self) -> Result<(), StorageError>;
}

/// What to write back for a slice when the main program ends.
#[derive(Clone, Debug, Default)]
enum Pending {
    #[default]
    Nothing,
    Store(SliceValues),
}

#[derive(Clone, Debug, Default)]
struct SliceState {
    /// The storage held variables for this id when it was first loaded.
    loaded_non_empty: bool,
    pending: Pending,
}

/// Retention policy for one top-level execution.
pub struct MemorySliceMgr {
    storage: Arc<dyn MemorySliceStorage>,
    slices: BTreeMap<MemorySliceId, SliceState>,
    closed: bool,
}

impl MemorySliceMgr {
    /// Open `storage` and start tracking slices.
    pub fn open(storage: Arc<dyn MemorySliceStorage>) -> Result<Self, EvalError> {
        storage.open()?;
        Ok(Self {
            storage,
            slices: BTreeMap::new(),
            closed: false,
        })
    }

    /// Load the stored slice for `id`.
    pub fn load(&mut self, id: &MemorySliceId) -> Result<SliceValues, EvalError> {
        let values = self.storage.load(id)?;
        tracing::debug!(%id, variables = values.len(), "memory slice loaded");
        let state = self.slices.entry(id.clone()).or_default();
        state.loaded_non_empty |= !values.is_empty();
        Ok(values)
    }

    /// The program ended in retain mode: store `values` at the end.
    pub fn retain(&mut self, id: &MemorySliceId, values: SliceValues) {
        self.slices.entry(id.clone()).or_default().pending = Pending::Store(values);
    }

    /// The program ended in discard mode: nothing must survive for `id`.
    ///
    /// A slice that existed in storage is overwritten with an empty map so
    /// the next load reads back empty.
    pub fn discard(&mut self, id: &MemorySliceId) {
        let state = self.slices.entry(id.clone()).or_default();
        state.pending = if state.loaded_non_empty {
            Pending::Store(SliceValues::default())
        } else {
            Pending::Nothing
        };
    }

    /// Slices that will be written on success, in id order.
    pub fn pending_ids(&self) -> Vec<MemorySliceId> {
        self.slices
            .iter()
            .filter(|(_, state)| matches!(state.pending, Pending::Store(_)))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Finish the execution: on success write every pending slice in one
    /// transaction. `close` runs last in every case.
    pub fn after_main_program_interpretation(&mut self, success: bool) -> Result<(), EvalError> {
        let stored = if success { self.store_pending() } else { Ok(()) };
        let closed = self.close();
        stored.and(closed)
    }

    fn store_pending(&mut self) -> Result<(), EvalError> {
        let pending: Vec<(MemorySliceId, SliceValues)> = std::mem::take(&mut self.slices)
            .into_iter()
            .filter_map(|(id, state)| match state.pending {
                Pending::Store(values) => Some((id, values)),
                Pending::Nothing => None,
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        self.storage.begin_trans()?;
        if let Err(err) = self.store_all(pending) {
            if let Err(rollback) = self.storage.rollback_trans() {
                tracing::warn!(error = %rollback, "rollback after failed store also failed");
            }
            return Err(err.into());
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(slices = pending.len()))]
    fn store_all(&self, pending: Vec<(MemorySliceId, SliceValues)>) -> Result<(), StorageError> {
        for (id, values) in pending {
            tracing::debug!(%id, variables = values.len(), "memory slice stored");
            crate::ExecutionContext::log(&crate::LogEntry::MemorySliceStore {
                id: id.clone(),
                variables: values.len(),
            });
            self.storage.store(&id, values)?;
        }
        self.storage.commit_trans()
    }

    fn close(&mut self) -> Result<(), EvalError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.storage.close().map_err(EvalError::from)
    }
}

impl Drop for MemorySliceMgr {
    /// Abandoned executions (a panic in a program) still close the storage.
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "closing memory slice storage failed");
        }
    }
}

impl fmt::Debug for MemorySliceMgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySliceMgr")
            .field("slices", &self.slices.keys().collect::<Vec<_>>())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
