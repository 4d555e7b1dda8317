//! End-to-end retention through the directory-backed storage.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use std::sync::Arc;

use common::{appender, fixed, silent, stored};
use pretty_assertions::assert_eq;
use rpg_eval::{
    Configuration, FileStorage, MemorySliceId, MemorySliceStorage, ProgramBuilder,
    DEFAULT_ACTIVATION_GROUP_NAME,
};
use rpg_ir::{Expression, NumberLayout, NumberRepresentation, NumberType, Statement};

const DEFAULT: &str = DEFAULT_ACTIVATION_GROUP_NAME;

#[test]
fn retained_values_outlive_the_storage_instance() {
    let dir = tempfile::tempdir().unwrap();
    let program = appender("PGM", None, "X", "ABC", false);
    for _ in 0..2 {
        let storage = Arc::new(FileStorage::new(dir.path()));
        program
            .single_call(&[], Configuration::new().with_memory_slice_storage(storage), silent())
            .unwrap();
    }
    let reopened = FileStorage::new(dir.path());
    assert_eq!(stored(&reopened, DEFAULT, "PGM", "X").as_deref(), Some("ABCABC"));
}

#[test]
fn last_record_deletes_the_slice_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()));
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    let id = MemorySliceId::new(DEFAULT, "PGM");

    appender("PGM", None, "X", "ABC", false)
        .single_call(&[], configuration.clone(), silent())
        .unwrap();
    assert!(storage.path_for(&id).exists());

    appender("PGM", None, "X", "ABC", true)
        .single_call(&[], configuration, silent())
        .unwrap();
    assert!(!storage.path_for(&id).exists());
    assert!(storage.load(&id).unwrap().is_empty());
}

#[test]
fn every_value_kind_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()));
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());

    let mut builder = ProgramBuilder::new("KINDS");
    let text = builder.variable("TEXT", fixed(5));
    let whole = builder.variable("WHOLE", NumberType::integer(10).unwrap().into());
    let amount = builder.variable("AMOUNT", NumberType::packed(7, 2).unwrap().into());
    let ds = builder
        .data_structure("DS", false, &[("CODE", fixed(2)), ("QTY", NumberType::zoned(3, 0).unwrap().into())])
        .unwrap();
    builder.statements([
        Statement::eval(Expression::data_ref(text), Expression::string("HELLO")),
        Statement::eval(Expression::data_ref(whole), Expression::IntLiteral(-42)),
        Statement::eval(
            Expression::data_ref(amount),
            Expression::RealLiteral("123.45".parse().unwrap()),
        ),
        Statement::eval(
            Expression::data_ref(Arc::clone(&ds.fields[0])),
            Expression::string("AB"),
        ),
        Statement::eval(
            Expression::data_ref(Arc::clone(&ds.fields[1])),
            Expression::IntLiteral(7),
        ),
    ]);
    builder
        .build()
        .single_call(&[], configuration, silent())
        .unwrap();

    let reopened = FileStorage::new(dir.path());
    assert_eq!(stored(&reopened, DEFAULT, "KINDS", "TEXT").as_deref(), Some("HELLO"));
    assert_eq!(stored(&reopened, DEFAULT, "KINDS", "WHOLE").as_deref(), Some("-42"));
    assert_eq!(stored(&reopened, DEFAULT, "KINDS", "AMOUNT").as_deref(), Some("123.45"));
    assert_eq!(stored(&reopened, DEFAULT, "KINDS", "DS").as_deref(), Some("AB007"));
}

#[test]
fn out_of_band_number_types_are_refused_on_load() {
    let valid = NumberLayout {
        entire_digits: 7,
        decimal_digits: 2,
        representation: NumberRepresentation::Packed,
    };
    let bytes = bincode::serialize(&valid).unwrap();
    assert_eq!(
        bincode::deserialize::<NumberType>(&bytes).unwrap(),
        NumberType::packed(7, 2).unwrap()
    );

    let corrupted = NumberLayout {
        entire_digits: 12,
        representation: NumberRepresentation::Binary,
        ..valid
    };
    let bytes = bincode::serialize(&corrupted).unwrap();
    let err = bincode::deserialize::<NumberType>(&bytes).unwrap_err();
    assert!(err.to_string().contains("binary types can have only up to 9 digits"));
}
