//! Execution context: ambient state for one top-level execution.
//!
//! [`ExecutionContext::execute`] installs a thread-local context for the
//! duration of its body and tears it down on every exit path. Code running
//! below it (the interpreter, the symbol table builder, storages) reaches
//! the configuration, the memory slice manager, the call stack and the
//! system interface through the associated functions here instead of
//! threading them through every signature.
//!
//! Outside `execute` every accessor degrades to a process-wide default, so
//! tests and tools can build programs and values without a full execution.
//!
//! # Isolation
//!
//! The context lives in a `thread_local!`, so concurrent executions on
//! different threads never observe each other. Contexts do not nest: a
//! second `execute` on the same thread fails with `AlreadyActive` before
//! touching anything.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rpg_value::{already_active, EvalError};
use rustc_hash::FxHashMap;

use crate::activation_group::ActivationGroupState;
use crate::call_stack::CallStack;
use crate::configuration::Configuration;
use crate::log::LogEntry;
use crate::memory_slice::MemorySliceMgr;
use crate::system_interface::SystemInterface;

/// Free-form key/value attributes shared by the code of one execution.
pub type Attributes = Arc<Mutex<FxHashMap<String, String>>>;

/// Ceiling of the id counter used outside any execution.
pub const FALLBACK_ID_LIMIT: u32 = 32_000;

static FALLBACK_IDS: AtomicU32 = AtomicU32::new(0);
static FALLBACK_ATTRIBUTES: OnceLock<Attributes> = OnceLock::new();

thread_local! {
    static CONTEXT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

struct Context {
    attributes: Attributes,
    next_id: u32,
    configuration: Configuration,
    memory_slice_mgr: Option<MemorySliceMgr>,
    call_stack: CallStack,
    system_interface: Arc<dyn SystemInterface>,
    program_name: Option<String>,
    activation_groups: ActivationGroupState,
}

/// Removes the context when `execute` unwinds or returns.
struct ContextGuard;

impl Drop for ContextGuard {
    fn drop(&mut self) {
        // Taken out first so the manager's own Drop (closing storage) runs
        // without the context borrowed.
        let context = CONTEXT
            .try_with(|cell| cell.borrow_mut().take())
            .ok()
            .flatten();
        drop(context);
    }
}

/// A part of the context moved out of the cell while a closure runs on it.
///
/// Put back on drop, unwinding included.
struct Detached<T: Default> {
    field: fn(&mut Context) -> &mut T,
    part: T,
}

impl<T: Default> Drop for Detached<T> {
    fn drop(&mut self) {
        let part = std::mem::take(&mut self.part);
        let field = self.field;
        let _ = CONTEXT.try_with(|cell| {
            if let Some(context) = cell.borrow_mut().as_mut() {
                *field(context) = part;
            }
        });
    }
}

/// Namespace for the thread-local execution context.
pub struct ExecutionContext;

impl ExecutionContext {
    /// Run `body` inside a fresh context.
    ///
    /// The memory slice manager (when storage is configured) is opened
    /// before `body` and finalized after it with the body's outcome. An
    /// error from `body` wins over a finalization error; the context is
    /// removed in every case. A panicking `body` is finalized as a failure
    /// before the panic resumes.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn execute<T>(
        configuration: Configuration,
        system_interface: Arc<dyn SystemInterface>,
        body: impl FnOnce() -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        if Self::is_active() {
            return Err(already_active());
        }
        let memory_slice_mgr = configuration
            .memory_slice_storage
            .clone()
            .map(MemorySliceMgr::open)
            .transpose()?;
        let call_stack = CallStack::new(configuration.options.max_call_depth);
        let context = Context {
            attributes: Attributes::default(),
            next_id: 0,
            configuration,
            memory_slice_mgr,
            call_stack,
            system_interface,
            program_name: None,
            activation_groups: ActivationGroupState::default(),
        };
        CONTEXT.with(|cell| *cell.borrow_mut() = Some(context));
        let _guard = ContextGuard;

        let result = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(result) => result,
            Err(payload) => {
                if let Some(mut mgr) = Self::take_memory_slice_mgr() {
                    if let Err(err) = mgr.after_main_program_interpretation(false) {
                        tracing::warn!(error = %err, "finalizing a panicked execution failed");
                    }
                }
                panic::resume_unwind(payload)
            }
        };

        let finalized = match Self::take_memory_slice_mgr() {
            Some(mut mgr) => mgr.after_main_program_interpretation(result.is_ok()),
            None => Ok(()),
        };
        match (result, finalized) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), finalized) => {
                if let Err(finalize_err) = finalized {
                    tracing::warn!(error = %finalize_err, "finalizing a failed execution also failed");
                }
                Err(err)
            }
        }
    }

    /// True when the current thread is inside `execute`.
    pub fn is_active() -> bool {
        CONTEXT.with(|cell| cell.borrow().is_some())
    }

    pub fn attributes() -> Attributes {
        Self::with_context(|context| Arc::clone(&context.attributes))
            .unwrap_or_else(|| Arc::clone(FALLBACK_ATTRIBUTES.get_or_init(Attributes::default)))
    }

    /// Active configuration, or the default one outside an execution.
    pub fn configuration() -> Configuration {
        Self::with_context(|context| context.configuration.clone()).unwrap_or_default()
    }

    /// Next id of the current execution, starting at 0.
    ///
    /// Outside an execution ids come from a process-wide counter that
    /// wraps to 0 at [`FALLBACK_ID_LIMIT`].
    pub fn new_unique_id() -> u32 {
        if let Some(id) = Self::with_context(|context| {
            let id = context.next_id;
            context.next_id = context.next_id.wrapping_add(1);
            id
        }) {
            return id;
        }
        let previous = FALLBACK_IDS
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(if id + 1 >= FALLBACK_ID_LIMIT { 0 } else { id + 1 })
            })
            .unwrap_or_default();
        if previous + 1 >= FALLBACK_ID_LIMIT {
            tracing::warn!(
                limit = FALLBACK_ID_LIMIT,
                "unique id counter outside an execution context wrapped to 0"
            );
        }
        previous
    }

    /// Run `f` on the memory slice manager; `None` when there is none.
    ///
    /// The manager is detached from the context while `f` runs, so storages
    /// may use every other accessor from their callbacks.
    pub fn with_memory_slice_mgr<R>(f: impl FnOnce(&mut MemorySliceMgr) -> R) -> Option<R> {
        Self::with_detached(|context| &mut context.memory_slice_mgr, |mgr| mgr.as_mut().map(f))
    }

    /// Run `f` on the call stack; outside an execution it sees an empty one.
    pub fn with_call_stack<R>(f: impl FnOnce(&mut CallStack) -> R) -> R {
        Self::with_detached(|context| &mut context.call_stack, f)
    }

    /// Name of the executing program; empty outside an execution.
    pub fn program_name() -> String {
        Self::with_context(|context| context.program_name.clone())
            .flatten()
            .unwrap_or_default()
    }

    /// Replace the executing program's name, returning the previous one.
    pub fn set_program_name(name: Option<String>) -> Option<String> {
        Self::with_context(|context| std::mem::replace(&mut context.program_name, name)).flatten()
    }

    pub fn system_interface() -> Option<Arc<dyn SystemInterface>> {
        Self::with_context(|context| Arc::clone(&context.system_interface))
    }

    pub(crate) fn with_activation_groups<R>(
        f: impl FnOnce(&mut ActivationGroupState) -> R,
    ) -> Option<R> {
        Self::with_context(|context| f(&mut context.activation_groups))
    }

    /// Send `entry` to the system interface's log handlers.
    pub fn log(entry: &LogEntry) {
        tracing::debug!(%entry, "log entry");
        let Some(system_interface) = Self::system_interface() else {
            return;
        };
        for handler in system_interface.log_handlers() {
            handler.handle(entry);
        }
    }

    /// Only for closures that never call back into `ExecutionContext`.
    fn with_context<R>(f: impl FnOnce(&mut Context) -> R) -> Option<R> {
        CONTEXT.with(|cell| cell.borrow_mut().as_mut().map(f))
    }

    /// Run `f` on `field` with the cell released; outside an execution
    /// `f` sees `T::default()`.
    fn with_detached<T: Default, R>(
        field: fn(&mut Context) -> &mut T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let Some(part) = Self::with_context(|context| std::mem::take(field(context))) else {
            return f(&mut T::default());
        };
        let mut detached = Detached { field, part };
        f(&mut detached.part)
    }

    fn take_memory_slice_mgr() -> Option<MemorySliceMgr> {
        Self::with_context(|context| context.memory_slice_mgr.take()).flatten()
    }
}
