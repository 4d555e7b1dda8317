//! Retain / discard semantics across executions and activation groups.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{appender, counter, fixed, shared_memory, silent, stored};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rpg_eval::{
    Configuration, ExecutionContext, InMemoryStorage, MemorySliceId, MemorySliceStorage,
    ProgramBuilder, SliceValues, DEFAULT_ACTIVATION_GROUP_NAME,
};
use rpg_ir::{ActivationGroupSpec, BinaryOp, Expression, NumberType, Statement, StringType, Type};
use rpg_value::{EvalErrorKind, StorageError, Value};

const DEFAULT: &str = DEFAULT_ACTIVATION_GROUP_NAME;

#[test]
fn retained_state_accumulates_across_calls() {
    let storage = shared_memory();
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    let program = appender("PGM", None, "X", "ABC", false);

    program.single_call(&[], configuration.clone(), silent()).unwrap();
    assert_eq!(stored(&*storage, DEFAULT, "PGM", "X").as_deref(), Some("ABC"));

    program.single_call(&[], configuration, silent()).unwrap();
    assert_eq!(stored(&*storage, DEFAULT, "PGM", "X").as_deref(), Some("ABCABC"));
}

#[test]
fn last_record_leaves_no_slice() {
    let storage = shared_memory();
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    appender("PGM", None, "X", "1", true)
        .single_call(&[], configuration, silent())
        .unwrap();
    assert!(storage.get(&MemorySliceId::new(DEFAULT, "PGM")).is_none());
    assert!(storage.is_empty());
}

#[test]
fn last_record_removes_a_previously_stored_slice() {
    let storage = shared_memory();
    let id = MemorySliceId::new(DEFAULT, "PGM");
    let mut seeded = SliceValues::default();
    seeded.insert("X".into(), Value::string("OLD"));
    storage.insert(id.clone(), seeded);

    appender("PGM", None, "X", "1", true)
        .single_call(&[], Configuration::new().with_memory_slice_storage(storage.clone()), silent())
        .unwrap();
    assert!(storage.get(&id).is_none());
}

#[test]
fn activation_groups_keep_separate_slices() {
    let storage = shared_memory();
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    let program = |name: &str, group: &str, text: &str| {
        let mut builder = ProgramBuilder::new(name);
        builder.activation_group(ActivationGroupSpec::Named(group.into()));
        let z = builder.variable("Z", fixed(4));
        builder.statement(Statement::eval(Expression::data_ref(z), Expression::string(text)));
        builder.build()
    };

    program("A", "MyActA", "xyzA")
        .single_call(&[], configuration.clone(), silent())
        .unwrap();
    program("B", "MyActB", "xyzB")
        .single_call(&[], configuration, silent())
        .unwrap();

    assert_eq!(stored(&*storage, "MYACTA", "A", "Z").as_deref(), Some("xyzA"));
    assert_eq!(stored(&*storage, "MYACTB", "B", "Z").as_deref(), Some("xyzB"));
    assert_eq!(stored(&*storage, "MYACTA", "B", "Z"), None);
    assert_eq!(stored(&*storage, "MYACTB", "A", "Z"), None);
}

#[test]
fn same_program_in_two_groups_does_not_collide() {
    let storage = shared_memory();
    let program = appender("PGM", None, "X", "ABC", false);
    for group in ["G1", "G2", "G1"] {
        let configuration = Configuration::new()
            .with_memory_slice_storage(storage.clone())
            .with_default_activation_group_name(group);
        program.single_call(&[], configuration, silent()).unwrap();
    }
    assert_eq!(stored(&*storage, "G1", "PGM", "X").as_deref(), Some("ABCABC"));
    assert_eq!(stored(&*storage, "G2", "PGM", "X").as_deref(), Some("ABC"));
}

#[test]
fn stored_values_are_loaded_before_the_program_runs() {
    let storage = shared_memory();
    let mut seeded = SliceValues::default();
    seeded.insert("Y".into(), Value::varying("A"));
    storage.insert(MemorySliceId::new(DEFAULT, "PRELOAD"), seeded);

    let mut builder = ProgramBuilder::new("PRELOAD");
    let y = builder.variable("Y", Type::String(StringType::varying(10)));
    let x = builder.entry_param("X", fixed(2));
    builder.statement(Statement::eval(
        Expression::data_ref(x),
        Expression::binary(
            BinaryOp::Add,
            Expression::data_ref(Arc::clone(&y)),
            Expression::data_ref(y),
        ),
    ));
    let result = builder
        .build()
        .single_call(
            &[("X", Value::string("B"))],
            Configuration::new().with_memory_slice_storage(storage),
            silent(),
        )
        .unwrap();
    assert_eq!(result.param("x").unwrap().render(), "AA");
}

#[test]
fn numbers_survive_the_round_trip() {
    let storage = shared_memory();
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    let program = counter("COUNTER");
    for _ in 0..3 {
        program.single_call(&[], configuration.clone(), silent()).unwrap();
    }
    assert_eq!(stored(&*storage, DEFAULT, "COUNTER", "N").as_deref(), Some("3"));
}

#[test]
fn failed_executions_store_nothing() {
    let storage = shared_memory();
    let mut builder = ProgramBuilder::new("FAILS");
    let x = builder.variable("X", fixed(3));
    let n = builder.variable("N", NumberType::zoned(5, 0).unwrap().into());
    builder.statements([
        Statement::eval(Expression::data_ref(x), Expression::string("ABC")),
        Statement::eval(
            Expression::data_ref(n),
            Expression::binary(BinaryOp::Div, Expression::IntLiteral(1), Expression::IntLiteral(0)),
        ),
    ]);
    let err = builder
        .build()
        .single_call(&[], Configuration::new().with_memory_slice_storage(storage.clone()), silent())
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    assert!(storage.is_empty());
}

/// Counts every storage call.
#[derive(Default)]
struct CountingStorage {
    calls: AtomicUsize,
    inner: InMemoryStorage,
}

impl CountingStorage {
    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl MemorySliceStorage for CountingStorage {
    fn open(&self) -> Result<(), StorageError> {
        self.count();
        Ok(())
    }

    fn load(&self, id: &MemorySliceId) -> Result<SliceValues, StorageError> {
        self.count();
        self.inner.load(id)
    }

    fn begin_trans(&self) -> Result<(), StorageError> {
        self.count();
        Ok(())
    }

    fn store(&self, id: &MemorySliceId, values: SliceValues) -> Result<(), StorageError> {
        self.count();
        self.inner.store(id, values)
    }

    fn commit_trans(&self) -> Result<(), StorageError> {
        self.count();
        Ok(())
    }

    fn rollback_trans(&self) -> Result<(), StorageError> {
        self.count();
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        self.count();
        Ok(())
    }
}

#[test]
fn nested_single_call_is_rejected_before_touching_storage() {
    let inner_storage = Arc::new(CountingStorage::default());
    let program = appender("PGM", None, "X", "ABC", false);
    let nested = ExecutionContext::execute(Configuration::new(), silent(), || {
        Ok(program.single_call(
            &[],
            Configuration::new().with_memory_slice_storage(inner_storage.clone()),
            silent(),
        ))
    })
    .unwrap();
    assert_eq!(nested.unwrap_err().kind, EvalErrorKind::AlreadyActive);
    assert_eq!(inner_storage.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn storage_sees_one_transaction_per_execution() {
    let storage = Arc::new(CountingStorage::default());
    appender("PGM", None, "X", "ABC", false)
        .single_call(&[], Configuration::new().with_memory_slice_storage(storage.clone()), silent())
        .unwrap();
    // open, load, begin, store, commit, close
    assert_eq!(storage.calls.load(Ordering::SeqCst), 6);
    assert_eq!(stored(&*storage, DEFAULT, "PGM", "X").as_deref(), Some("ABC"));
}

/// Asks the execution context who is loading.
#[derive(Default)]
struct ProgramAwareStorage {
    loaders: Mutex<Vec<String>>,
    inner: InMemoryStorage,
}

impl MemorySliceStorage for ProgramAwareStorage {
    fn open(&self) -> Result<(), StorageError> {
        self.inner.open()
    }

    fn load(&self, id: &MemorySliceId) -> Result<SliceValues, StorageError> {
        let group = ExecutionContext::configuration().default_activation_group_name;
        self.loaders
            .lock()
            .push(format!("{group}:{}", ExecutionContext::program_name()));
        self.inner.load(id)
    }

    fn begin_trans(&self) -> Result<(), StorageError> {
        self.inner.begin_trans()
    }

    fn store(&self, id: &MemorySliceId, values: SliceValues) -> Result<(), StorageError> {
        self.inner.store(id, values)
    }

    fn commit_trans(&self) -> Result<(), StorageError> {
        self.inner.commit_trans()
    }

    fn rollback_trans(&self) -> Result<(), StorageError> {
        self.inner.rollback_trans()
    }

    fn close(&self) -> Result<(), StorageError> {
        self.inner.close()
    }
}

#[test]
fn storage_may_query_the_context_while_loading() {
    let storage = Arc::new(ProgramAwareStorage::default());
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    let program = appender("PGM", None, "X", "ABC", false);

    program.single_call(&[], configuration.clone(), silent()).unwrap();
    program.single_call(&[], configuration, silent()).unwrap();

    assert_eq!(
        *storage.loaders.lock(),
        vec![format!("{DEFAULT}:PGM"), format!("{DEFAULT}:PGM")]
    );
    assert_eq!(stored(&storage.inner, DEFAULT, "PGM", "X").as_deref(), Some("ABCABC"));
}
