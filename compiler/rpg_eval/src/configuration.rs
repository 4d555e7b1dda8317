//! Runtime configuration.
//!
//! A [`Configuration`] is cheap to clone and `Send + Sync`, so one instance
//! can drive any number of concurrent executions.

use std::fmt;
use std::sync::Arc;

use rpg_value::EvalError;

use crate::memory_slice::MemorySliceStorage;
use crate::symbol_table::SymbolTable;

/// Activation group of programs that declare none.
pub const DEFAULT_ACTIVATION_GROUP_NAME: &str = "*DFTACTGRP";

/// `(program, resolved group) -> replacement group`.
pub type ActivationGroupHook = dyn Fn(&str, &str) -> Option<String> + Send + Sync;
/// `program -> force retain (true) or discard (false)`.
pub type ExitInRtHook = dyn Fn(&str) -> Option<bool> + Send + Sync;
pub type EnterPgmHook = dyn Fn(&str, &SymbolTable) + Send + Sync;
pub type ExitPgmHook = dyn Fn(&str, &SymbolTable, Option<&EvalError>) + Send + Sync;

/// Host hooks into the program lifecycle. Every hook defaults to a no-op.
#[derive(Clone)]
pub struct Callbacks {
    pub get_activation_group: Arc<ActivationGroupHook>,
    pub exit_in_rt: Arc<ExitInRtHook>,
    pub on_enter_pgm: Arc<EnterPgmHook>,
    pub on_exit_pgm: Arc<ExitPgmHook>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            get_activation_group: Arc::new(|_: &str, _: &str| None::<String>),
            exit_in_rt: Arc::new(|_: &str| None::<bool>),
            on_enter_pgm: Arc::new(|_: &str, _: &SymbolTable| {}),
            on_exit_pgm: Arc::new(|_: &str, _: &SymbolTable, _: Option<&EvalError>| {}),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Maximum nesting of program calls; `None` is unlimited.
    pub max_call_depth: Option<usize>,
}

#[derive(Clone)]
pub struct Configuration {
    /// Persistence for retained program state; `None` skips it entirely.
    pub memory_slice_storage: Option<Arc<dyn MemorySliceStorage>>,
    pub default_activation_group_name: String,
    pub callbacks: Callbacks,
    pub options: Options,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_memory_slice_storage(mut self, storage: Arc<dyn MemorySliceStorage>) -> Self {
        self.memory_slice_storage = Some(storage);
        self
    }

    #[must_use]
    pub fn with_default_activation_group_name(mut self, name: impl Into<String>) -> Self {
        self.default_activation_group_name = name.into();
        self
    }

    #[must_use]
    pub fn with_activation_group_hook(
        mut self,
        hook: impl Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.get_activation_group = Arc::new(hook);
        self
    }

    #[must_use]
    pub fn with_exit_in_rt_hook(
        mut self,
        hook: impl Fn(&str) -> Option<bool> + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.exit_in_rt = Arc::new(hook);
        self
    }

    #[must_use]
    pub fn with_enter_pgm_hook(
        mut self,
        hook: impl Fn(&str, &SymbolTable) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_enter_pgm = Arc::new(hook);
        self
    }

    #[must_use]
    pub fn with_exit_pgm_hook(
        mut self,
        hook: impl Fn(&str, &SymbolTable, Option<&EvalError>) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.on_exit_pgm = Arc::new(hook);
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.options.max_call_depth = Some(depth);
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            memory_slice_storage: None,
            default_activation_group_name: DEFAULT_ACTIVATION_GROUP_NAME.to_string(),
            callbacks: Callbacks::default(),
            options: Options::default(),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field(
                "memory_slice_storage",
                &self.memory_slice_storage.as_ref().map(|_| "<storage>"),
            )
            .field(
                "default_activation_group_name",
                &self.default_activation_group_name,
            )
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
