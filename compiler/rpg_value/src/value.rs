//! Runtime values.

use std::fmt;

use chrono::NaiveDateTime;
use rpg_ir::{Decimal, FigurativeConstant, Type};

use crate::buffer::{DataStructValue, ProjectedArray};
use crate::errors::{index_out_of_bounds, EvalError};

/// Character used for `*HIVAL` in character data.
pub const HIVAL_CHAR: char = '\u{FF}';
/// Character used for `*LOVAL` in character data.
pub const LOVAL_CHAR: char = '\u{0}';

/// Text format of a timestamp (26 characters).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H.%M.%S%.6f";

/// A character string, fixed or varying.
///
/// Fixed strings are kept padded to their declared length by coercion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringValue {
    pub value: String,
    pub varying: bool,
}

impl StringValue {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            varying: false,
        }
    }

    pub fn varying(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            varying: true,
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// True when every character is a blank.
    pub fn is_blank(&self) -> bool {
        self.value.chars().all(|c| c == ' ')
    }
}

/// A fixed-length array.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "ArraySnapshot", into = "ArraySnapshot")
)]
pub enum ArrayValue {
    /// Elements owned by the array itself.
    Concrete {
        elements: Vec<Value>,
        element_type: Type,
    },
    /// Elements live in a data structure buffer.
    Projected(ProjectedArray),
}

impl ArrayValue {
    pub fn new(elements: Vec<Value>, element_type: Type) -> Self {
        Self::Concrete {
            elements,
            element_type,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Concrete { elements, .. } => elements.len(),
            Self::Projected(projected) => projected.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> &Type {
        match self {
            Self::Concrete { element_type, .. } => element_type,
            Self::Projected(projected) => projected.element_type(),
        }
    }

    /// Element at a zero-based index.
    pub fn get(&self, index: usize) -> Result<Value, EvalError> {
        match self {
            Self::Concrete { elements, .. } => elements
                .get(index)
                .cloned()
                .ok_or_else(|| out_of_bounds(index, elements.len())),
            Self::Projected(projected) => projected.get(index),
        }
    }

    /// Replace the element at a zero-based index, coercing it first.
    ///
    /// Projected arrays write straight into their data structure.
    pub fn set(&mut self, index: usize, value: &Value) -> Result<(), EvalError> {
        match self {
            Self::Concrete {
                elements,
                element_type,
            } => {
                let len = elements.len();
                let coerced = value.for_type(element_type)?;
                let slot = elements
                    .get_mut(index)
                    .ok_or_else(|| out_of_bounds(index, len))?;
                *slot = coerced;
                Ok(())
            }
            Self::Projected(projected) => projected.set(index, value),
        }
    }

    /// All elements, read in order.
    pub fn elements(&self) -> Vec<Value> {
        match self {
            Self::Concrete { elements, .. } => elements.clone(),
            Self::Projected(projected) => projected.snapshot(),
        }
    }

    /// A concrete copy that no longer aliases any buffer.
    #[must_use]
    pub fn detached(&self) -> ArrayValue {
        match self {
            Self::Concrete {
                elements,
                element_type,
            } => Self::Concrete {
                elements: elements.iter().map(Value::detached).collect(),
                element_type: element_type.clone(),
            },
            Self::Projected(projected) => Self::Concrete {
                elements: projected.snapshot(),
                element_type: projected.element_type().clone(),
            },
        }
    }
}

fn out_of_bounds(index: usize, len: usize) -> EvalError {
    index_out_of_bounds(i64::try_from(index).unwrap_or(i64::MAX).saturating_add(1), len)
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        self.element_type() == other.element_type() && self.elements() == other.elements()
    }
}

/// Serialized form of an array: always concrete.
#[cfg(feature = "serde")]
#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct ArraySnapshot {
    element_type: Type,
    elements: Vec<Value>,
}

#[cfg(feature = "serde")]
impl From<ArrayValue> for ArraySnapshot {
    fn from(array: ArrayValue) -> Self {
        Self {
            element_type: array.element_type().clone(),
            elements: array.elements(),
        }
    }
}

#[cfg(feature = "serde")]
impl From<ArraySnapshot> for ArrayValue {
    fn from(snapshot: ArraySnapshot) -> Self {
        ArrayValue::new(snapshot.elements, snapshot.element_type)
    }
}

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Str(StringValue),
    Int(i64),
    Decimal(Decimal),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Array(ArrayValue),
    DataStruct(DataStructValue),
    /// Not yet bound to a target type.
    Figurative(FigurativeConstant),
}

impl Value {
    /// Fixed-length string value.
    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(StringValue::fixed(value))
    }

    /// Varying-length string value.
    pub fn varying(value: impl Into<String>) -> Self {
        Value::Str(StringValue::varying(value))
    }

    pub fn decimal(unscaled: i128, scale: u32) -> Self {
        Value::Decimal(Decimal::new(unscaled, scale))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(string) => Some(&string.value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            Value::Figurative(FigurativeConstant::On) => Some(true),
            Value::Figurative(FigurativeConstant::Off) => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(int) => Some(*int),
            Value::Decimal(decimal) => decimal.to_i64(),
            _ => None,
        }
    }

    /// Numeric value as a decimal, integers included.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(int) => Some(Decimal::from_i64(*int)),
            Value::Decimal(decimal) => Some(*decimal),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Decimal(_))
    }

    /// A deep copy sharing no buffer with `self`.
    ///
    /// Field projections and projected arrays become standalone values.
    #[must_use]
    pub fn detached(&self) -> Value {
        match self {
            Value::Array(array) => Value::Array(array.detached()),
            Value::DataStruct(ds) => Value::DataStruct(ds.detached()),
            other => other.clone(),
        }
    }

    /// Character representation, as `DSPLY` and `%CHAR` show it.
    pub fn render(&self) -> String {
        match self {
            Value::Str(string) => string.value.clone(),
            Value::Int(int) => int.to_string(),
            Value::Decimal(decimal) => decimal.to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Timestamp(timestamp) => timestamp.format(TIMESTAMP_FORMAT).to_string(),
            Value::Array(array) => {
                let elements: Vec<String> = array.elements().iter().map(Value::render).collect();
                format!("[{}]", elements.join(", "))
            }
            Value::DataStruct(ds) => ds.text(),
            Value::Figurative(constant) => constant.to_string(),
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Str(string) => format!("string \"{}\"", string.value),
            Value::Int(int) => format!("integer {int}"),
            Value::Decimal(decimal) => format!("decimal {decimal}"),
            Value::Bool(flag) => format!("boolean {flag}"),
            Value::Timestamp(_) => format!("timestamp {}", self.render()),
            Value::Array(array) => format!("array of {} {}", array.len(), array.element_type()),
            Value::DataStruct(ds) => format!("data structure of {} characters", ds.len()),
            Value::Figurative(constant) => format!("figurative {constant}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<ArrayValue> for Value {
    fn from(value: ArrayValue) -> Self {
        Value::Array(value)
    }
}

impl From<DataStructValue> for Value {
    fn from(value: DataStructValue) -> Self {
        Value::DataStruct(value)
    }
}
