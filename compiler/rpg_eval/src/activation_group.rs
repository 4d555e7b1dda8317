//! Activation groups: which program invocations share retained state.
//!
//! A program's group comes from its `ACTGRP` declaration, resolved against
//! the caller and the configuration, and may be overridden by the host
//! through the `get_activation_group` callback.

use rpg_ir::ActivationGroupSpec;
use rustc_hash::FxHashMap;

use crate::configuration::Configuration;
use crate::context::ExecutionContext;
use crate::memory_slice::{MemorySliceId, SliceValues};

/// Resolve the activation group `program` runs in.
///
/// `caller_group` is `None` for the main program of an execution.
pub fn resolve_activation_group(
    program: &str,
    spec: Option<&ActivationGroupSpec>,
    caller_group: Option<&str>,
    configuration: &Configuration,
) -> String {
    let resolved = match spec {
        Some(ActivationGroupSpec::Named(name)) => name.to_uppercase(),
        Some(ActivationGroupSpec::Caller) => caller_group
            .unwrap_or(&configuration.default_activation_group_name)
            .to_string(),
        Some(ActivationGroupSpec::New) => format!("*NEW{}", ExecutionContext::new_unique_id()),
        None => configuration.default_activation_group_name.clone(),
    };
    (configuration.callbacks.get_activation_group)(program, &resolved).unwrap_or(resolved)
}

/// Variables retained by programs within the current execution.
///
/// This is what makes a second `CALL` of a program that ended in RT see
/// its previous values, whether or not a storage is configured. An entry
/// exists from the first call on; a discarded program leaves an empty one.
#[derive(Debug, Default)]
pub struct ActivationGroupState {
    slices: FxHashMap<MemorySliceId, SliceValues>,
}

impl ActivationGroupState {
    /// Values retained for `id`, if the program already ran.
    pub fn get(&self, id: &MemorySliceId) -> Option<&SliceValues> {
        self.slices.get(id)
    }

    pub fn contains(&self, id: &MemorySliceId) -> bool {
        self.slices.contains_key(id)
    }

    pub fn retain(&mut self, id: MemorySliceId, values: SliceValues) {
        self.slices.insert(id, values);
    }

    pub fn discard(&mut self, id: MemorySliceId) {
        self.slices.insert(id, SliceValues::default());
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

#[cfg(test)]
mod tests;
