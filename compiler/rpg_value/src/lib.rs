//! RPG Value - runtime values for the RPG runtime.
//!
//! # Architecture
//!
//! - [`Value`]: every runtime value, from strings to data structures
//! - [`Value::for_type`]: coercion, the funnel every assignment goes through
//! - [`DataStructValue`] / [`FieldView`] / [`ProjectedArray`]: overlay views
//!   into one shared character buffer
//! - [`encoding`]: how numbers and other scalars are laid out in that buffer
//! - [`EvalError`]: the error taxonomy shared by the whole runtime

mod buffer;
mod coercion;
pub mod encoding;
pub mod errors;
mod value;

pub use buffer::{DataStructValue, FieldView, ProjectedArray, SharedBuffer};
pub use errors::{
    already_active, call_depth_exceeded, division_by_zero, index_out_of_bounds, invalid_operands,
    key_collision, not_found, not_implemented, numeric_overflow, program_not_found, unsupported_coercion,
    BacktraceFrame, EvalBacktrace, EvalError, EvalErrorKind, EvalResult, StorageError,
};
pub use value::{
    ArrayValue, StringValue, Value, HIVAL_CHAR, LOVAL_CHAR, TIMESTAMP_FORMAT,
};
