//! Built-in functions.

use rpg_ir::{BuiltInFunction, Expression, Type};
use rpg_value::{EvalError, EvalResult, Value};

/// Apply `function` to the evaluated `value` of `argument`.
///
/// `%LEN` of a number needs the declared digits, hence the expression.
pub(crate) fn call_built_in(
    function: BuiltInFunction,
    value: &Value,
    argument: &Expression,
) -> EvalResult {
    match function {
        BuiltInFunction::Trim => trim(value),
        BuiltInFunction::Char => Ok(Value::varying(value.render())),
        BuiltInFunction::Len => len(value, argument),
    }
}

fn trim(value: &Value) -> EvalResult {
    match value {
        Value::Str(string) => Ok(Value::varying(string.value.trim_matches(' '))),
        Value::DataStruct(ds) => Ok(Value::varying(ds.text().trim_matches(' '))),
        other => Err(requires("%TRIM", "a string", other)),
    }
}

fn len(value: &Value, argument: &Expression) -> EvalResult {
    let length = match value {
        Value::Str(string) => string.len(),
        Value::DataStruct(ds) => ds.len(),
        Value::Int(_) | Value::Decimal(_) => match argument.ty()? {
            Type::Number(number) => number.digits() as usize,
            _ => value
                .as_decimal()
                .map_or(0, |decimal| decimal.precision() as usize),
        },
        other => return Err(requires("%LEN", "a string or a number", other)),
    };
    Ok(Value::Int(i64::try_from(length).unwrap_or(i64::MAX)))
}

#[cold]
fn requires(function: &str, expected: &str, found: &Value) -> EvalError {
    EvalError::new(format!(
        "{function} requires {expected}, found {}",
        found.describe()
    ))
}
