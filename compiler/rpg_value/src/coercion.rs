//! Coercion: the single funnel every assignment passes through.
//!
//! [`Value::for_type`] dispatches on (value kind, target type) in one match.
//! Pairs without a defined conversion fail with `UnsupportedCoercion`.
//!
//! - strings are truncated to the declared length; fixed strings are padded
//!   with blanks, varying strings are not
//! - numbers are rescaled to the target's decimal digits, truncating unless
//!   the caller asks for half-up rounding; an integer part wider than the
//!   target's entire digits (or a negative unsigned) is a numeric overflow
//! - arrays are coerced element-wise; a scalar is broadcast to every element
//! - figurative constants take the target type's concrete representation

use chrono::{NaiveDate, NaiveDateTime};
use rpg_ir::decimal::pow10;
use rpg_ir::{ArrayType, Decimal, FigurativeConstant, NumberRepresentation, NumberType, Rounding, Type};

use crate::buffer::DataStructValue;
use crate::errors::{numeric_overflow, unsupported_coercion, EvalError};
use crate::value::{ArrayValue, StringValue, Value, HIVAL_CHAR, LOVAL_CHAR, TIMESTAMP_FORMAT};

impl Value {
    /// Coerce to `ty`, truncating extra decimal digits.
    pub fn for_type(&self, ty: &Type) -> Result<Value, EvalError> {
        self.coerce(ty, Rounding::Truncate)
    }

    /// Coerce to `ty` with an explicit rounding mode for numeric targets.
    pub fn coerce(&self, ty: &Type, rounding: Rounding) -> Result<Value, EvalError> {
        match (self, ty) {
            (Value::Figurative(constant), _) => figurative_for(*constant, ty),
            (_, Type::Figurative) => Ok(self.clone()),

            (Value::Str(string), Type::String(target)) => {
                Ok(fit_string(&string.value, target.length, target.varying))
            }
            (Value::Str(string), Type::Character(length)) => {
                Ok(fit_string(&string.value, *length, false))
            }
            (
                Value::DataStruct(_) | Value::Bool(_) | Value::Timestamp(_),
                Type::String(_) | Type::Character(_),
            ) => Value::string(self.render()).coerce(ty, rounding),

            (Value::Int(_) | Value::Decimal(_), Type::Number(number)) => {
                let decimal = self.as_decimal().unwrap_or_default();
                coerce_number(decimal, *number, rounding)
            }

            (Value::Bool(flag), Type::Boolean) => Ok(Value::Bool(*flag)),
            (Value::Str(string), Type::Boolean) => match string.value.as_str() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                _ => Err(unsupported_coercion(self, ty)),
            },

            (Value::Timestamp(timestamp), Type::TimeStamp) => Ok(Value::Timestamp(*timestamp)),
            (Value::Str(string), Type::TimeStamp) => {
                NaiveDateTime::parse_from_str(string.value.trim(), TIMESTAMP_FORMAT)
                    .map(Value::Timestamp)
                    .map_err(|_| unsupported_coercion(self, ty))
            }

            (Value::Array(array), Type::Array(target)) => coerce_array(array, target, rounding),
            (_, Type::Array(target)) => broadcast(self, target, rounding),

            (Value::DataStruct(ds), Type::DataStructure(target)) => {
                if ds.len() == target.element_size {
                    Ok(Value::DataStruct(ds.clone()))
                } else {
                    Ok(Value::DataStruct(DataStructValue::from_text(
                        &ds.text(),
                        target.element_size,
                    )))
                }
            }
            (Value::Str(string), Type::DataStructure(target)) => Ok(Value::DataStruct(
                DataStructValue::from_text(&string.value, target.element_size),
            )),

            _ => Err(unsupported_coercion(self, ty)),
        }
    }

    /// The value a freshly declared (or cleared) variable of `ty` holds.
    pub fn blank(ty: &Type) -> Result<Value, EvalError> {
        figurative_for(FigurativeConstant::Blanks, ty)
    }
}

/// Truncate, and pad fixed strings with blanks.
fn fit_string(text: &str, length: usize, varying: bool) -> Value {
    let mut value: String = text.chars().take(length).collect();
    if !varying {
        let missing = length - value.chars().count();
        value.extend(std::iter::repeat(' ').take(missing));
    }
    Value::Str(StringValue { value, varying })
}

/// Integer types hold `Int` when the value fits, everything else `Decimal`.
pub(crate) fn number_value(decimal: Decimal, number: NumberType) -> Value {
    if number.is_integer() {
        if let Some(int) = decimal.to_i64() {
            return Value::Int(int);
        }
    }
    Value::Decimal(decimal)
}

fn coerce_number(
    decimal: Decimal,
    number: NumberType,
    rounding: Rounding,
) -> Result<Value, EvalError> {
    let scaled = decimal
        .rescale(number.decimal_digits(), rounding)
        .ok_or_else(|| numeric_overflow(&format!("coercion to {number}")))?;
    let unsigned = number.representation() == NumberRepresentation::Unsigned;
    if scaled.integer_digits() > number.entire_digits() || (unsigned && scaled.is_negative()) {
        return Err(numeric_overflow(&format!("coercion to {number}")));
    }
    Ok(number_value(scaled, number))
}

fn coerce_array(
    array: &ArrayValue,
    target: &ArrayType,
    rounding: Rounding,
) -> Result<Value, EvalError> {
    // A projection already shaped like the target stays a live view.
    if let ArrayValue::Projected(projected) = array {
        if projected.count() == target.count && projected.element_type() == &*target.element {
            return Ok(Value::Array(array.clone()));
        }
    }
    let mut elements = Vec::with_capacity(target.count);
    for element in array.elements().into_iter().take(target.count) {
        elements.push(element.coerce(&target.element, rounding)?);
    }
    while elements.len() < target.count {
        elements.push(Value::blank(&target.element)?);
    }
    Ok(Value::Array(ArrayValue::new(
        elements,
        (*target.element).clone(),
    )))
}

fn broadcast(value: &Value, target: &ArrayType, rounding: Rounding) -> Result<Value, EvalError> {
    let element = value.coerce(&target.element, rounding)?;
    Ok(repeated(&element, target))
}

/// `count` copies of `element`, none sharing a data structure buffer.
fn repeated(element: &Value, target: &ArrayType) -> Value {
    let elements = (0..target.count).map(|_| element.detached()).collect();
    Value::Array(ArrayValue::new(elements, (*target.element).clone()))
}

/// `0001-01-01-00.00.00.000000`, the `*LOVAL` timestamp.
pub(crate) fn low_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// `9999-12-31-23.59.59.999999`, the `*HIVAL` timestamp.
pub(crate) fn high_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_micro_opt(23, 59, 59, 999_999))
        .unwrap_or_default()
}

/// Largest magnitude a number type can hold.
fn extreme(number: NumberType, negative: bool) -> Value {
    let unscaled = pow10(number.digits()).map_or(i128::MAX, |limit| limit - 1);
    let signed = if negative {
        if number.representation() == NumberRepresentation::Unsigned {
            0
        } else {
            -unscaled
        }
    } else {
        unscaled
    };
    number_value(Decimal::new(signed, number.decimal_digits()), number)
}

fn filled(fill: char, length: usize, varying: bool) -> Value {
    Value::Str(StringValue {
        value: std::iter::repeat(fill).take(length).collect(),
        varying,
    })
}

fn figurative_for(constant: FigurativeConstant, ty: &Type) -> Result<Value, EvalError> {
    use FigurativeConstant::{Blanks, HiVal, LowVal, Off, On, Zeros};

    match (constant, ty) {
        (_, Type::Figurative) => Ok(Value::Figurative(constant)),
        (On | Off, _) => Value::Bool(constant == On).for_type(ty),
        (_, Type::Array(target)) => {
            let element = figurative_for(constant, &target.element)?;
            Ok(repeated(&element, target))
        }

        (Blanks, Type::String(string)) if string.varying => Ok(Value::varying("")),
        (Blanks, Type::String(string)) => Ok(filled(' ', string.length, false)),
        (Blanks, Type::Character(length)) => Ok(filled(' ', *length, false)),
        (Zeros, Type::String(string)) => Ok(filled('0', string.length, string.varying)),
        (Zeros, Type::Character(length)) => Ok(filled('0', *length, false)),
        (HiVal, Type::String(string)) => Ok(filled(HIVAL_CHAR, string.length, string.varying)),
        (HiVal, Type::Character(length)) => Ok(filled(HIVAL_CHAR, *length, false)),
        (LowVal, Type::String(string)) => Ok(filled(LOVAL_CHAR, string.length, string.varying)),
        (LowVal, Type::Character(length)) => Ok(filled(LOVAL_CHAR, *length, false)),

        (Blanks | Zeros, Type::Number(number)) => {
            Ok(number_value(Decimal::new(0, number.decimal_digits()), *number))
        }
        (HiVal, Type::Number(number)) => Ok(extreme(*number, false)),
        (LowVal, Type::Number(number)) => Ok(extreme(*number, true)),

        (HiVal, Type::Boolean) => Ok(Value::Bool(true)),
        (Blanks | Zeros | LowVal, Type::Boolean) => Ok(Value::Bool(false)),

        (HiVal, Type::TimeStamp) => Ok(Value::Timestamp(high_timestamp())),
        (Blanks | Zeros | LowVal, Type::TimeStamp) => Ok(Value::Timestamp(low_timestamp())),

        (Blanks, Type::DataStructure(target)) => {
            Ok(Value::DataStruct(DataStructValue::blank(target)?))
        }
        (Zeros | HiVal | LowVal, Type::DataStructure(target)) => {
            let fill = match constant {
                Zeros => '0',
                HiVal => HIVAL_CHAR,
                _ => LOVAL_CHAR,
            };
            let text: String = std::iter::repeat(fill).take(target.element_size).collect();
            Ok(Value::DataStruct(DataStructValue::from_text(
                &text,
                target.element_size,
            )))
        }

        _ => Err(unsupported_coercion(&Value::Figurative(constant), ty)),
    }
}
