#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

/// Records every call and fails `store` when asked to.
#[derive(Default)]
struct RecordingStorage {
    calls: Mutex<Vec<String>>,
    fail_store: bool,
    inner: InMemoryStorage,
}

impl RecordingStorage {
    fn failing() -> Self {
        Self {
            fail_store: true,
            ..Self::default()
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl MemorySliceStorage for RecordingStorage {
    fn open(&self) -> Result<(), StorageError> {
        self.record("open");
        Ok(())
    }

    fn load(&self, id: &MemorySliceId) -> Result<SliceValues, StorageError> {
        self.record("load");
        self.inner.load(id)
    }

    fn begin_trans(&self) -> Result<(), StorageError> {
        self.record("begin");
        Ok(())
    }

    fn store(&self, id: &MemorySliceId, values: SliceValues) -> Result<(), StorageError> {
        self.record("store");
        if self.fail_store {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.inner.store(id, values)
    }

    fn commit_trans(&self) -> Result<(), StorageError> {
        self.record("commit");
        Ok(())
    }

    fn rollback_trans(&self) -> Result<(), StorageError> {
        self.record("rollback");
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        self.record("close");
        Ok(())
    }
}

fn id(group: &str) -> MemorySliceId {
    MemorySliceId::new(group, "PGM")
}

fn values(pairs: &[(&str, &str)]) -> SliceValues {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), Value::string(*value)))
        .collect()
}

#[test]
fn retained_slices_are_stored_in_one_transaction() {
    let storage = Arc::new(RecordingStorage::default());
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    mgr.load(&id("A")).unwrap();
    mgr.retain(&id("A"), values(&[("X", "1")]));
    mgr.retain(&id("B"), values(&[("X", "2")]));
    mgr.after_main_program_interpretation(true).unwrap();

    assert_eq!(
        storage.calls(),
        vec!["open", "load", "begin", "store", "store", "commit", "close"]
    );
    assert_eq!(storage.inner.get(&id("A")), Some(values(&[("X", "1")])));
    assert_eq!(storage.inner.get(&id("B")), Some(values(&[("X", "2")])));
}

#[test]
fn failure_stores_nothing_but_still_closes() {
    let storage = Arc::new(RecordingStorage::default());
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    mgr.retain(&id("A"), values(&[("X", "1")]));
    mgr.after_main_program_interpretation(false).unwrap();
    assert_eq!(storage.calls(), vec!["open", "close"]);
    assert!(storage.inner.is_empty());
}

#[test]
fn store_failure_rolls_back_and_propagates_verbatim() {
    let storage = Arc::new(RecordingStorage::failing());
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    mgr.retain(&id("A"), values(&[("X", "1")]));
    let err = mgr.after_main_program_interpretation(true).unwrap_err();
    assert_eq!(
        err.as_storage(),
        Some(&StorageError::Backend("disk full".to_string()))
    );
    assert_eq!(
        storage.calls(),
        vec!["open", "begin", "store", "rollback", "close"]
    );
}

#[test]
fn discard_after_empty_load_writes_nothing() {
    let storage = Arc::new(RecordingStorage::default());
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    mgr.load(&id("A")).unwrap();
    mgr.discard(&id("A"));
    assert!(mgr.pending_ids().is_empty());
    mgr.after_main_program_interpretation(true).unwrap();
    assert_eq!(storage.calls(), vec!["open", "load", "close"]);
}

#[test]
fn discard_after_non_empty_load_clears_the_slice() {
    let storage = Arc::new(RecordingStorage::default());
    storage.inner.insert(id("A"), values(&[("X", "old")]));
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    assert_eq!(mgr.load(&id("A")).unwrap(), values(&[("X", "old")]));
    mgr.discard(&id("A"));
    mgr.after_main_program_interpretation(true).unwrap();
    assert_eq!(storage.inner.get(&id("A")), None);
    assert!(storage.inner.load(&id("A")).unwrap().is_empty());
}

#[test]
fn later_retain_overrides_earlier_discard() {
    let storage = Arc::new(RecordingStorage::default());
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    mgr.discard(&id("A"));
    mgr.retain(&id("A"), values(&[("X", "kept")]));
    assert_eq!(mgr.pending_ids(), vec![id("A")]);
}

#[test]
fn dropping_an_unfinished_manager_closes_storage() {
    let storage = Arc::new(RecordingStorage::default());
    let mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    drop(mgr);
    assert_eq!(storage.calls(), vec!["open", "close"]);
}

#[test]
fn close_runs_once() {
    let storage = Arc::new(RecordingStorage::default());
    let mut mgr = MemorySliceMgr::open(storage.clone()).unwrap();
    mgr.after_main_program_interpretation(true).unwrap();
    drop(mgr);
    assert_eq!(storage.calls(), vec!["open", "close"]);
}

#[test]
fn slice_ids_display_group_and_program() {
    assert_eq!(MemorySliceId::new("MYACT", "PGM").to_string(), "MYACT/PGM");
}

mod file_storage {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stores_are_invisible_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("slices"));
        storage.open().unwrap();
        storage.begin_trans().unwrap();
        storage.store(&id("A"), values(&[("X", "1")])).unwrap();
        assert!(storage.load(&id("A")).unwrap().is_empty());
        storage.commit_trans().unwrap();
        assert_eq!(storage.load(&id("A")).unwrap(), values(&[("X", "1")]));
        assert!(storage.path_for(&id("A")).exists());
    }

    #[test]
    fn rollback_discards_buffered_stores() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.open().unwrap();
        storage.begin_trans().unwrap();
        storage.store(&id("A"), values(&[("X", "1")])).unwrap();
        storage.rollback_trans().unwrap();
        assert!(storage.load(&id("A")).unwrap().is_empty());
    }

    #[test]
    fn store_outside_a_transaction_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.open().unwrap();
        assert_eq!(
            storage.store(&id("A"), SliceValues::default()),
            Err(StorageError::NoTransaction)
        );
        storage.begin_trans().unwrap();
        assert_eq!(storage.begin_trans(), Err(StorageError::TransactionInProgress));
    }

    #[test]
    fn empty_store_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.open().unwrap();
        for slice in [values(&[("X", "1")]), SliceValues::default()] {
            storage.begin_trans().unwrap();
            storage.store(&id("A"), slice).unwrap();
            storage.commit_trans().unwrap();
        }
        assert!(!storage.path_for(&id("A")).exists());
    }

    #[test]
    fn rich_values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.open().unwrap();
        let mut slice = SliceValues::default();
        slice.insert("S".to_string(), Value::varying("hello"));
        slice.insert("I".to_string(), Value::Int(-42));
        slice.insert("D".to_string(), Value::decimal(12_345, 2));
        slice.insert("B".to_string(), Value::Bool(true));
        slice.insert(
            "DS".to_string(),
            Value::DataStruct(rpg_value::DataStructValue::from_text("AB12", 4)),
        );
        storage.begin_trans().unwrap();
        storage.store(&id("A"), slice.clone()).unwrap();
        storage.commit_trans().unwrap();
        assert_eq!(storage.load(&id("A")).unwrap(), slice);
    }

    #[test]
    fn distinct_groups_use_distinct_files() {
        let storage = FileStorage::new("unused");
        assert_ne!(storage.path_for(&id("A/B")), storage.path_for(&id("A_B")));
    }
}
