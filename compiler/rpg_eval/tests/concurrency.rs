//! Independent executions on many threads sharing one storage.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use common::{appender, counter, shared_memory, silent, stored};
use pretty_assertions::assert_eq;
use rayon::prelude::*;
use rpg_eval::{Configuration, ExecutionContext, FileStorage, MemorySliceStorage};
use std::sync::Arc;

const EXECUTIONS: usize = 40;
const REPETITIONS: usize = 4;

fn group(index: usize) -> String {
    format!("GROUP{index}")
}

#[test]
fn parallel_executions_never_share_state() {
    let storage = shared_memory();
    let program = counter("COUNTER");

    (0..EXECUTIONS).into_par_iter().for_each(|index| {
        let configuration = Configuration::new()
            .with_memory_slice_storage(storage.clone())
            .with_default_activation_group_name(group(index));
        for _ in 0..REPETITIONS {
            program
                .single_call(&[], configuration.clone(), silent())
                .unwrap();
            assert!(!ExecutionContext::is_active());
        }
    });

    assert_eq!(storage.len(), EXECUTIONS);
    let expected = REPETITIONS.to_string();
    for index in 0..EXECUTIONS {
        assert_eq!(
            stored(&*storage, &group(index), "COUNTER", "N").as_deref(),
            Some(expected.as_str())
        );
    }
}

#[test]
fn parallel_programs_in_one_group_stay_apart() {
    let storage = shared_memory();
    let configuration = Configuration::new().with_memory_slice_storage(storage.clone());
    let programs: Vec<_> = (0..EXECUTIONS)
        .map(|index| appender(&format!("PGM{index}"), None, "X", &format!("{index}."), false))
        .collect();

    programs.par_iter().for_each(|program| {
        for _ in 0..REPETITIONS {
            program
                .single_call(&[], configuration.clone(), silent())
                .unwrap();
        }
    });

    for index in 0..EXECUTIONS {
        let expected = format!("{index}.").repeat(REPETITIONS);
        assert_eq!(
            stored(
                &*storage,
                rpg_eval::DEFAULT_ACTIVATION_GROUP_NAME,
                &format!("PGM{index}"),
                "X"
            ),
            Some(expected)
        );
    }
}

#[test]
fn file_storage_handles_parallel_transactions() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn MemorySliceStorage> = Arc::new(FileStorage::new(dir.path()));
    let program = counter("COUNTER");

    (0..12).into_par_iter().for_each(|index| {
        let configuration = Configuration::new()
            .with_memory_slice_storage(Arc::clone(&storage))
            .with_default_activation_group_name(group(index));
        for _ in 0..REPETITIONS {
            program
                .single_call(&[], configuration.clone(), silent())
                .unwrap();
        }
    });

    let expected = REPETITIONS.to_string();
    for index in 0..12 {
        assert_eq!(
            stored(&*storage, &group(index), "COUNTER", "N").as_deref(),
            Some(expected.as_str())
        );
    }
}
