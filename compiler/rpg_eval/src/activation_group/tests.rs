#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;
use rpg_value::Value;

fn resolve(spec: Option<ActivationGroupSpec>, caller: Option<&str>) -> String {
    resolve_activation_group("PGM", spec.as_ref(), caller, &Configuration::default())
}

#[test]
fn named_groups_are_upper_cased() {
    assert_eq!(
        resolve(Some(ActivationGroupSpec::Named("MyAct".into())), None),
        "MYACT"
    );
}

#[test]
fn absent_spec_uses_the_configured_default() {
    assert_eq!(resolve(None, Some("CALLERS")), "*DFTACTGRP");
    let configuration = Configuration::new().with_default_activation_group_name("QILE");
    assert_eq!(
        resolve_activation_group("PGM", None, None, &configuration),
        "QILE"
    );
}

#[test]
fn caller_spec_follows_the_caller() {
    assert_eq!(resolve(Some(ActivationGroupSpec::Caller), Some("OUTER")), "OUTER");
    assert_eq!(resolve(Some(ActivationGroupSpec::Caller), None), "*DFTACTGRP");
}

#[test]
fn new_spec_yields_a_fresh_group_each_time() {
    let first = resolve(Some(ActivationGroupSpec::New), None);
    let second = resolve(Some(ActivationGroupSpec::New), None);
    assert!(first.starts_with("*NEW"));
    assert_ne!(first, second);
}

#[test]
fn hook_overrides_the_resolved_group() {
    let configuration = Configuration::new().with_activation_group_hook(|program, resolved| {
        (program == "PGM").then(|| format!("{resolved}-X"))
    });
    let spec = ActivationGroupSpec::Named("A".into());
    assert_eq!(
        resolve_activation_group("PGM", Some(&spec), None, &configuration),
        "A-X"
    );
    assert_eq!(
        resolve_activation_group("OTHER", Some(&spec), None, &configuration),
        "A"
    );
}

#[test]
fn discarded_programs_keep_an_empty_entry() {
    let mut state = ActivationGroupState::default();
    let id = MemorySliceId::new("G", "PGM");
    let mut values = SliceValues::default();
    values.insert("X".to_string(), Value::string("1"));
    state.retain(id.clone(), values.clone());
    assert_eq!(state.get(&id), Some(&values));
    state.discard(id.clone());
    assert!(state.contains(&id));
    assert!(state.get(&id).unwrap().is_empty());
    assert_eq!(state.len(), 1);
}
