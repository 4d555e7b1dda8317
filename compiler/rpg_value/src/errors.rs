//! Error types for evaluation.
//!
//! `EvalErrorKind` is the structured category callers match on. Factory
//! functions (e.g. `not_found()`) are the public API: they populate both
//! `kind` and `message`.

use std::fmt;

use rpg_ir::TypeError;

use crate::value::Value;

/// Result of evaluation.
pub type EvalResult = Result<Value, EvalError>;

/// Failure reported by a memory slice storage backend.
///
/// Storages return these verbatim; the runtime wraps them in
/// [`EvalErrorKind::Storage`] without altering them.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage is not open")]
    NotOpen,
    #[error("no transaction in progress")]
    NoTransaction,
    #[error("a transaction is already in progress")]
    TransactionInProgress,
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("cannot serialize memory slice {slice}: {message}")]
    Serialization { slice: String, message: String },
    #[error("{0}")]
    Backend(String),
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("invalid type definition: {message}")]
    InvalidTypeDefinition { message: String },

    #[error("cannot coerce {value} to {target}")]
    UnsupportedCoercion { value: String, target: String },

    #[error("{name} not found")]
    NotFound { name: String },

    /// Two different definitions claim the same key.
    #[error("key {key} is bound to {existing}, not {requested}")]
    KeyCollision {
        key: u32,
        existing: String,
        requested: String,
    },

    #[error("an execution context is already active on this thread")]
    AlreadyActive,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("index {index} out of bounds (1..={len})")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("operator {operator} cannot be applied to {left} and {right}")]
    InvalidOperands {
        operator: String,
        left: String,
        right: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in {operation}")]
    NumericOverflow { operation: String },

    #[error("program {name} not found")]
    ProgramNotFound { name: String },

    #[error("maximum call depth exceeded (limit: {depth})")]
    CallDepthExceeded { depth: usize },

    #[error("{feature} is not implemented")]
    NotImplemented { feature: String },

    #[error("{message}")]
    Custom { message: String },
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Program name.
    pub name: String,
}

/// Snapshot of the program call stack at an error site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "program backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {}", frame.name)?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// For factory-created errors, this equals `kind.to_string()`.
    pub message: String,
    /// Program call stack at the error site, when one was active.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind).
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
            backtrace: None,
        }
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            backtrace: None,
        }
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// The storage failure this error wraps, if any.
    pub fn as_storage(&self) -> Option<&StorageError> {
        match &self.kind {
            EvalErrorKind::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<StorageError> for EvalError {
    fn from(err: StorageError) -> Self {
        Self::from_kind(EvalErrorKind::Storage(err))
    }
}

impl From<TypeError> for EvalError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidTypeDefinition { message } => {
                Self::from_kind(EvalErrorKind::InvalidTypeDefinition { message })
            }
            TypeError::NotInferable { .. } => Self::from_kind(EvalErrorKind::NotImplemented {
                feature: err.to_string(),
            }),
            TypeError::VariableSize { .. } | TypeError::NotAnArray { .. } => {
                Self::new(err.to_string())
            }
        }
    }
}

// Factory functions

#[cold]
pub fn unsupported_coercion(value: &Value, target: &rpg_ir::Type) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnsupportedCoercion {
        value: value.describe(),
        target: target.to_string(),
    })
}

#[cold]
pub fn not_found(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotFound {
        name: name.to_string(),
    })
}

#[cold]
pub fn key_collision(key: u32, existing: &str, requested: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::KeyCollision {
        key,
        existing: existing.to_string(),
        requested: requested.to_string(),
    })
}

#[cold]
pub fn already_active() -> EvalError {
    EvalError::from_kind(EvalErrorKind::AlreadyActive)
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index, len })
}

#[cold]
pub fn invalid_operands(operator: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperands {
        operator: operator.to_string(),
        left: left.describe(),
        right: right.describe(),
    })
}

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn numeric_overflow(operation: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NumericOverflow {
        operation: operation.to_string(),
    })
}

#[cold]
pub fn program_not_found(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ProgramNotFound {
        name: name.to_string(),
    })
}

#[cold]
pub fn call_depth_exceeded(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::CallDepthExceeded { depth })
}

#[cold]
pub fn not_implemented(feature: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotImplemented {
        feature: feature.to_string(),
    })
}
