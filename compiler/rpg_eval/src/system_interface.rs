//! The host side of the runtime: display output, log handlers and the
//! programs reachable through `CALL`.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::display_handler::{buffer_display, silent_display, stdout_display, SharedDisplayHandler};
use crate::log::LogHandler;
use crate::program::Program;

pub trait SystemInterface: Send + Sync {
    /// Show `text` (`DSPLY`).
    fn display(&self, text: &str);

    /// Handlers that receive every log entry of an execution.
    fn log_handlers(&self) -> Vec<Arc<dyn LogHandler>>;

    fn add_log_handler(&self, handler: Arc<dyn LogHandler>);

    /// Program called by name (case-insensitive).
    fn find_program(&self, name: &str) -> Option<Arc<Program>>;
}

/// Programs registered in memory, output to a [`DisplayHandler`](crate::DisplayHandler).
pub struct DefaultSystemInterface {
    display: SharedDisplayHandler,
    log_handlers: RwLock<Vec<Arc<dyn LogHandler>>>,
    programs: DashMap<String, Arc<Program>>,
}

impl DefaultSystemInterface {
    pub fn new(display: SharedDisplayHandler) -> Self {
        Self {
            display,
            log_handlers: RwLock::new(Vec::new()),
            programs: DashMap::new(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(stdout_display())
    }

    /// Displayed text is captured; read it with [`output`](Self::output).
    pub fn buffered() -> Self {
        Self::new(buffer_display())
    }

    pub fn silent() -> Self {
        Self::new(silent_display())
    }

    /// Captured display output.
    pub fn output(&self) -> String {
        self.display.output()
    }

    /// Make `program` callable by its name.
    pub fn register(&self, program: Program) -> Arc<Program> {
        let program = Arc::new(program);
        self.programs
            .insert(program.name().to_uppercase(), Arc::clone(&program));
        program
    }
}

impl fmt::Debug for DefaultSystemInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSystemInterface")
            .field("display", &self.display)
            .field("log_handlers", &self.log_handlers.read().len())
            .field("programs", &self.programs.len())
            .finish()
    }
}

impl Default for DefaultSystemInterface {
    fn default() -> Self {
        Self::stdout()
    }
}

impl SystemInterface for DefaultSystemInterface {
    fn display(&self, text: &str) {
        self.display.display(text);
    }

    fn log_handlers(&self) -> Vec<Arc<dyn LogHandler>> {
        self.log_handlers.read().clone()
    }

    fn add_log_handler(&self, handler: Arc<dyn LogHandler>) {
        self.log_handlers.write().push(handler);
    }

    fn find_program(&self, name: &str) -> Option<Arc<Program>> {
        self.programs
            .get(&name.to_uppercase())
            .map(|entry| Arc::clone(entry.value()))
    }
}
