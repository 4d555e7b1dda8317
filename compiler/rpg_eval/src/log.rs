//! Language-level log entries and their handlers.
//!
//! Entries are produced by the interpreter and routed through
//! [`ExecutionContext::log`](crate::ExecutionContext::log) to the handlers
//! registered on the system interface.

use std::fmt;

use parking_lot::Mutex;

use crate::memory_slice::MemorySliceId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogEntry {
    ProgramStart {
        program: String,
        activation_group: String,
    },
    ProgramEnd {
        program: String,
        /// `true` when the program's state is retained for the next call.
        retained: bool,
    },
    Assignment {
        program: String,
        name: String,
        value: String,
    },
    Display {
        program: String,
        text: String,
    },
    Call {
        caller: String,
        callee: String,
    },
    MemorySliceLoad {
        id: MemorySliceId,
        variables: usize,
    },
    MemorySliceStore {
        id: MemorySliceId,
        variables: usize,
    },
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramStart {
                program,
                activation_group,
            } => write!(f, "[{program}] start in {activation_group}"),
            Self::ProgramEnd { program, retained } => {
                let mode = if *retained { "RT" } else { "LR" };
                write!(f, "[{program}] end ({mode})")
            }
            Self::Assignment {
                program,
                name,
                value,
            } => write!(f, "[{program}] {name} = {value}"),
            Self::Display { program, text } => write!(f, "[{program}] DSPLY {text}"),
            Self::Call { caller, callee } => write!(f, "[{caller}] CALL {callee}"),
            Self::MemorySliceLoad { id, variables } => {
                write!(f, "load {id}: {variables} variables")
            }
            Self::MemorySliceStore { id, variables } => {
                write!(f, "store {id}: {variables} variables")
            }
        }
    }
}

/// Receives log entries from running programs.
pub trait LogHandler: Send + Sync {
    fn handle(&self, entry: &LogEntry);
}

/// Keeps every entry in memory, for hosts and tests that inspect them.
#[derive(Debug, Default)]
pub struct BufferLogHandler {
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferLogHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl LogHandler for BufferLogHandler {
    fn handle(&self, entry: &LogEntry) {
        self.entries.lock().push(entry.clone());
    }
}
