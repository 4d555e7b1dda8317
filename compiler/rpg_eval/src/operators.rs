//! Binary and unary operators.
//!
//! Direct enum dispatch on the operand kinds. Integer arithmetic stays in
//! `i64` while it fits; anything involving a decimal (or a division) is
//! computed on [`Decimal`] with checked operations, so overflow always
//! surfaces as `NumericOverflow`.

use std::cmp::Ordering;

use rpg_ir::{BinaryOp, Decimal, FigurativeConstant, NumberType, StringType, Type, UnaryOp};
use rpg_value::{
    division_by_zero, invalid_operands, numeric_overflow, EvalError, EvalResult, StringValue,
    Value,
};

/// Minimum number of fractional digits kept by a division.
pub const DIVISION_SCALE: u32 = 10;

#[inline]
fn checked(result: Option<Value>, operation: &'static str) -> EvalResult {
    result.ok_or_else(|| numeric_overflow(operation))
}

#[inline]
fn operation_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "addition",
        BinaryOp::Sub => "subtraction",
        BinaryOp::Mul => "multiplication",
        BinaryOp::Div => "division",
        _ => op.as_symbol(),
    }
}

pub fn evaluate_binary(left: Value, right: Value, op: BinaryOp) -> EvalResult {
    let (left, right) = resolve_figuratives(left, right)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => eval_int_binary(*a, *b, op),
        (Value::Int(_) | Value::Decimal(_), Value::Int(_) | Value::Decimal(_)) => {
            match (left.as_decimal(), right.as_decimal()) {
                (Some(a), Some(b)) => eval_decimal_binary(a, b, op),
                _ => Err(invalid_operands(op.as_symbol(), &left, &right)),
            }
        }
        (Value::Str(a), Value::Str(b)) => eval_string_binary(a, b, op)
            .ok_or_else(|| invalid_operands(op.as_symbol(), &left, &right)),
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(*a, *b, op)
            .ok_or_else(|| invalid_operands(op.as_symbol(), &left, &right)),
        (Value::Timestamp(a), Value::Timestamp(b)) => compare(a.cmp(b), op)
            .ok_or_else(|| invalid_operands(op.as_symbol(), &left, &right)),
        _ => Err(invalid_operands(op.as_symbol(), &left, &right)),
    }
}

pub fn evaluate_unary(operand: &Value, op: UnaryOp) -> EvalResult {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(int)) => checked(int.checked_neg().map(Value::Int), "negation"),
        (UnaryOp::Neg, Value::Decimal(decimal)) => {
            checked(decimal.checked_neg().map(Value::Decimal), "negation")
        }
        (UnaryOp::Not, _) => match operand.as_bool() {
            Some(flag) => Ok(Value::Bool(!flag)),
            None => Err(EvalError::new(format!(
                "NOT cannot be applied to {}",
                operand.describe()
            ))),
        },
        (UnaryOp::Neg, _) => Err(EvalError::new(format!(
            "negation cannot be applied to {}",
            operand.describe()
        ))),
    }
}

/// Give a figurative operand the concrete form of the other side.
fn resolve_figuratives(left: Value, right: Value) -> Result<(Value, Value), EvalError> {
    match (&left, &right) {
        (Value::Figurative(_), Value::Figurative(_)) => Ok((left, right)),
        (Value::Figurative(constant), other) => {
            let resolved = resolve_figurative(*constant, other)?;
            Ok((resolved, right))
        }
        (other, Value::Figurative(constant)) => {
            let resolved = resolve_figurative(*constant, other)?;
            Ok((left, resolved))
        }
        _ => Ok((left, right)),
    }
}

fn resolve_figurative(constant: FigurativeConstant, other: &Value) -> EvalResult {
    let ty = match other {
        Value::Str(string) => Type::String(StringType::fixed(string.len())),
        Value::Int(_) | Value::Decimal(_) => {
            let decimal = other.as_decimal().unwrap_or_default();
            Type::Number(NumberType::zoned(
                decimal.integer_digits().max(1),
                decimal.scale(),
            )?)
        }
        Value::Bool(_) => Type::Boolean,
        Value::Timestamp(_) => Type::TimeStamp,
        _ => return Ok(Value::Figurative(constant)),
    };
    Value::Figurative(constant).for_type(&ty)
}

fn compare(ordering: Ordering, op: BinaryOp) -> Option<Value> {
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Value::Bool(result))
}

fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => checked(a.checked_add(b).map(Value::Int), "addition"),
        BinaryOp::Sub => checked(a.checked_sub(b).map(Value::Int), "subtraction"),
        BinaryOp::Mul => checked(a.checked_mul(b).map(Value::Int), "multiplication"),
        BinaryOp::Div => eval_decimal_binary(Decimal::from_i64(a), Decimal::from_i64(b), op),
        _ => compare(a.cmp(&b), op)
            .ok_or_else(|| invalid_operands(op.as_symbol(), &Value::Int(a), &Value::Int(b))),
    }
}

/// Decimal arithmetic. Division keeps at least [`DIVISION_SCALE`]
/// fractional digits; assignment then truncates or rounds to the target.
fn eval_decimal_binary(a: Decimal, b: Decimal, op: BinaryOp) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(division_by_zero());
            }
            let scale = a.scale().max(b.scale()).max(DIVISION_SCALE);
            a.checked_div(b, scale)
        }
        _ => {
            return compare(a.cmp(&b), op).ok_or_else(|| {
                invalid_operands(op.as_symbol(), &Value::Decimal(a), &Value::Decimal(b))
            })
        }
    };
    checked(result.map(Value::Decimal), operation_name(op))
}

/// `+` concatenates; comparisons pad the shorter side with blanks.
fn eval_string_binary(a: &StringValue, b: &StringValue, op: BinaryOp) -> Option<Value> {
    if op == BinaryOp::Add {
        let mut joined = String::with_capacity(a.value.len() + b.value.len());
        joined.push_str(&a.value);
        joined.push_str(&b.value);
        return Some(Value::varying(joined));
    }
    let width = a.len().max(b.len());
    let padded = |string: &StringValue| {
        string
            .value
            .chars()
            .chain(std::iter::repeat(' '))
            .take(width)
            .collect::<Vec<char>>()
    };
    compare(padded(a).cmp(&padded(b)), op)
}

fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> Option<Value> {
    match op {
        BinaryOp::And => Some(Value::Bool(a && b)),
        BinaryOp::Or => Some(Value::Bool(a || b)),
        BinaryOp::Eq | BinaryOp::NotEq => compare(a.cmp(&b), op),
        _ => None,
    }
}
