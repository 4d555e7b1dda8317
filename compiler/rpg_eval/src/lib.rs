//! RPG Eval - execution runtime for resolved RPG programs.
//!
//! # Architecture
//!
//! - [`SymbolTable`]: current value of every data definition, keyed by
//!   [`DataKey`](rpg_ir::DataKey) with a case-insensitive name index
//! - [`MemorySliceMgr`]: what a program retains between calls, persisted
//!   through a pluggable [`MemorySliceStorage`] ([`InMemoryStorage`],
//!   [`FileStorage`])
//! - [`ExecutionContext`]: thread-local ambient state for one top-level
//!   execution (configuration, ids, call stack, system interface)
//! - [`Program`] / [`Interpreter`]: the program lifecycle and the
//!   statement evaluator that drives everything above
//!
//! # Logging
//!
//! Runtime diagnostics go through `tracing`; call [`init_tracing`] and set
//! `RUST_LOG` (for example `RUST_LOG=rpg_eval=debug`) to see them.
//! Language-level events ([`LogEntry`]) go to the [`LogHandler`]s of the
//! system interface instead.

mod activation_group;
mod call_stack;
mod configuration;
mod context;
mod display_handler;
mod interpreter;
mod log;
pub mod memory_slice;
mod operators;
mod program;
mod stack;
mod symbol_table;
mod system_interface;

use std::sync::Once;

pub use activation_group::{resolve_activation_group, ActivationGroupState};
pub use call_stack::{CallFrame, CallStack};
pub use configuration::{
    ActivationGroupHook, Callbacks, Configuration, EnterPgmHook, ExitInRtHook, ExitPgmHook,
    Options, DEFAULT_ACTIVATION_GROUP_NAME,
};
pub use context::{Attributes, ExecutionContext, FALLBACK_ID_LIMIT};
pub use display_handler::{
    buffer_display, silent_display, stdout_display, BufferDisplayHandler, DisplayHandler,
    SharedDisplayHandler,
};
pub use interpreter::Interpreter;
pub use log::{BufferLogHandler, LogEntry, LogHandler};
pub use memory_slice::{
    FileStorage, InMemoryStorage, MemorySliceId, MemorySliceMgr, MemorySliceStorage, SliceValues,
};
pub use operators::{evaluate_binary, evaluate_unary, DIVISION_SCALE};
pub use program::{CallResult, Program, ProgramBuilder};
pub use stack::ensure_sufficient_stack;
pub use symbol_table::SymbolTable;
pub use system_interface::{DefaultSystemInterface, SystemInterface};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
