//! Directory-backed storage: one `bincode` file per slice.
//!
//! Stores are buffered per thread between `begin_trans` and
//! `commit_trans`; `rollback_trans` and `close` drop the buffer.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rpg_value::StorageError;
use rustc_hash::FxHashMap;

use super::{MemorySliceId, MemorySliceStorage, SliceValues};

const EXTENSION: &str = "slice";

#[derive(Debug)]
pub struct FileStorage {
    directory: PathBuf,
    /// Open transactions, one per thread.
    transactions: Mutex<FxHashMap<ThreadId, Vec<(MemorySliceId, SliceValues)>>>,
}

impl FileStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            transactions: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File holding the slice for `id`.
    ///
    /// Names are hex-encoded so any group or program name maps to a
    /// distinct, portable file name.
    pub fn path_for(&self, id: &MemorySliceId) -> PathBuf {
        self.directory.join(format!(
            "{}.{}.{EXTENSION}",
            hex(&id.activation_group),
            hex(&id.program_name)
        ))
    }

    fn write(&self, id: &MemorySliceId, values: &SliceValues) -> Result<(), StorageError> {
        let path = self.path_for(id);
        if values.is_empty() {
            return match fs::remove_file(&path) {
                Err(err) if err.kind() != ErrorKind::NotFound => Err(io_error(&path, &err)),
                _ => Ok(()),
            };
        }
        let bytes = bincode::serialize(values).map_err(|err| StorageError::Serialization {
            slice: id.to_string(),
            message: err.to_string(),
        })?;
        fs::write(&path, bytes).map_err(|err| io_error(&path, &err))
    }
}

fn hex(text: &str) -> String {
    text.bytes().map(|byte| format!("{byte:02x}")).collect()
}

fn io_error(path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

impl MemorySliceStorage for FileStorage {
    fn open(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.directory).map_err(|err| io_error(&self.directory, &err))
    }

    fn load(&self, id: &MemorySliceId) -> Result<SliceValues, StorageError> {
        let path = self.path_for(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SliceValues::default()),
            Err(err) => return Err(io_error(&path, &err)),
        };
        bincode::deserialize(&bytes).map_err(|err| StorageError::Serialization {
            slice: id.to_string(),
            message: err.to_string(),
        })
    }

    fn begin_trans(&self) -> Result<(), StorageError> {
        let mut transactions = self.transactions.lock();
        let thread = thread::current().id();
        if transactions.contains_key(&thread) {
            return Err(StorageError::TransactionInProgress);
        }
        transactions.insert(thread, Vec::new());
        Ok(())
    }

    fn store(&self, id: &MemorySliceId, values: SliceValues) -> Result<(), StorageError> {
        let mut transactions = self.transactions.lock();
        let pending = transactions
            .get_mut(&thread::current().id())
            .ok_or(StorageError::NoTransaction)?;
        pending.push((id.clone(), values));
        Ok(())
    }

    fn commit_trans(&self) -> Result<(), StorageError> {
        let pending = self
            .transactions
            .lock()
            .remove(&thread::current().id())
            .ok_or(StorageError::NoTransaction)?;
        for (id, values) in &pending {
            self.write(id, values)?;
        }
        Ok(())
    }

    fn rollback_trans(&self) -> Result<(), StorageError> {
        self.transactions
            .lock()
            .remove(&thread::current().id())
            .map(|_| ())
            .ok_or(StorageError::NoTransaction)
    }

    fn close(&self) -> Result<(), StorageError> {
        if self
            .transactions
            .lock()
            .remove(&thread::current().id())
            .is_some()
        {
            tracing::warn!("memory slice transaction abandoned on close");
        }
        Ok(())
    }
}
