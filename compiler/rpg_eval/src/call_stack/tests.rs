#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;
use rpg_value::EvalErrorKind;

fn frame(program: &str) -> CallFrame {
    CallFrame {
        program: program.to_string(),
        activation_group: "*DFTACTGRP".to_string(),
    }
}

#[test]
fn push_and_pop_track_depth() {
    let mut stack = CallStack::default();
    assert!(stack.is_empty());
    stack.push(frame("MAIN")).unwrap();
    stack.push(frame("SUB")).unwrap();
    assert_eq!(stack.depth(), 2);
    assert_eq!(stack.current().unwrap().program, "SUB");
    assert_eq!(stack.pop().unwrap().program, "SUB");
    assert_eq!(stack.depth(), 1);
}

#[test]
fn depth_limit_rejects_without_pushing() {
    let mut stack = CallStack::new(Some(1));
    stack.push(frame("MAIN")).unwrap();
    let err = stack.push(frame("SUB")).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::CallDepthExceeded { depth: 1 }));
    assert_eq!(stack.depth(), 1);
}

#[test]
fn backtrace_lists_most_recent_first() {
    let mut stack = CallStack::default();
    stack.push(frame("MAIN")).unwrap();
    stack.push(frame("SUB")).unwrap();
    let err = stack.attach_backtrace(EvalError::new("boom"));
    let names: Vec<&str> = err
        .backtrace
        .as_ref()
        .unwrap()
        .frames()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["SUB", "MAIN"]);
}

#[test]
fn existing_backtrace_is_kept() {
    let mut inner = CallStack::default();
    inner.push(frame("INNER")).unwrap();
    let err = inner.attach_backtrace(EvalError::new("boom"));

    let mut outer = CallStack::default();
    outer.push(frame("OUTER")).unwrap();
    let err = outer.attach_backtrace(err);
    assert_eq!(err.backtrace.unwrap().frames()[0].name, "INNER");
}

#[test]
fn empty_stack_attaches_nothing() {
    let err = CallStack::default().attach_backtrace(EvalError::new("boom"));
    assert!(err.backtrace.is_none());
}
