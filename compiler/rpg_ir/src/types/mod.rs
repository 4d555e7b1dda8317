//! Type System.
//!
//! Every runtime value and data definition carries a [`Type`]. Types know
//! their storage size in the character buffer of a data structure, their
//! numeric digit layout, and which other types may be assigned to them.
//!
//! # Sizes
//!
//! `NumberType` sizes depend on the representation:
//!
//! | Representation   | Digits  | Bytes                   |
//! |------------------|---------|-------------------------|
//! | zoned            | 1..=38  | digits                  |
//! | packed           | 1..=38  | `ceil((digits + 1) / 2)` |
//! | binary           | 1..=4   | 2                       |
//! | binary           | 5..=9   | 4                       |
//! | integer/unsigned | 1..=3   | 1                       |
//! | integer/unsigned | 4..=5   | 2                       |
//! | integer/unsigned | 6..=10  | 4                       |
//! | integer/unsigned | 11..=20 | 8                       |
//!
//! Anything outside these bands is rejected when the type is built.

use std::fmt;

use crate::decimal::MAX_DIGITS;
use crate::errors::{invalid_type_definition, TypeError};

/// Width of a timestamp in its character form (`YYYY-MM-DD-hh.mm.ss.ffffff`).
pub const TIMESTAMP_SIZE: usize = 26;

/// Physical storage of a numeric field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberRepresentation {
    /// One character per digit, sign folded into the last digit.
    #[default]
    Zoned,
    /// Two digits per byte plus a sign nibble.
    Packed,
    /// Big-endian two's complement, sized by digit bands.
    Binary,
    Integer,
    Unsigned,
}

impl NumberRepresentation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zoned => "zoned",
            Self::Packed => "packed",
            Self::Binary => "binary",
            Self::Integer => "integer",
            Self::Unsigned => "unsigned",
        }
    }
}

/// Fixed-length or varying character string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringType {
    pub length: usize,
    pub varying: bool,
}

impl StringType {
    pub fn fixed(length: usize) -> Self {
        Self {
            length,
            varying: false,
        }
    }

    pub fn varying(length: usize) -> Self {
        Self {
            length,
            varying: true,
        }
    }
}

/// Fixed-point number with an explicit digit layout.
///
/// Built only through [`NumberType::new`], which validates the digit bands.
/// Deserialization goes through [`NumberLayout`] and the same checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "NumberLayout"))]
pub struct NumberType {
    entire_digits: u32,
    decimal_digits: u32,
    representation: NumberRepresentation,
}

/// Unchecked digit layout of a [`NumberType`], as found in persisted data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberLayout {
    pub entire_digits: u32,
    pub decimal_digits: u32,
    pub representation: NumberRepresentation,
}

impl TryFrom<NumberLayout> for NumberType {
    type Error = TypeError;

    fn try_from(layout: NumberLayout) -> Result<Self, TypeError> {
        Self::new(
            layout.entire_digits,
            layout.decimal_digits,
            layout.representation,
        )
    }
}

impl NumberType {
    /// Validate and build a numeric type.
    pub fn new(
        entire_digits: u32,
        decimal_digits: u32,
        representation: NumberRepresentation,
    ) -> Result<Self, TypeError> {
        let ty = Self {
            entire_digits,
            decimal_digits,
            representation,
        };
        let digits = ty.digits();
        if digits == 0 {
            return Err(invalid_type_definition(format!(
                "{ty} must have at least one digit"
            )));
        }
        match representation {
            NumberRepresentation::Integer | NumberRepresentation::Unsigned => {
                if decimal_digits != 0 {
                    return Err(invalid_type_definition(format!(
                        "{ty}: integer and unsigned types cannot have decimal digits"
                    )));
                }
                if entire_digits > 20 {
                    return Err(invalid_type_definition(format!(
                        "{ty}: integer and unsigned types can have only up to 20 digits"
                    )));
                }
            }
            NumberRepresentation::Binary => {
                if digits > 9 {
                    return Err(invalid_type_definition(format!(
                        "{ty}: binary types can have only up to 9 digits"
                    )));
                }
            }
            NumberRepresentation::Zoned | NumberRepresentation::Packed => {
                if digits > MAX_DIGITS {
                    return Err(invalid_type_definition(format!(
                        "{ty}: at most {MAX_DIGITS} digits are supported"
                    )));
                }
            }
        }
        Ok(ty)
    }

    /// Zoned number, the default representation of standalone numerics.
    pub fn zoned(entire_digits: u32, decimal_digits: u32) -> Result<Self, TypeError> {
        Self::new(entire_digits, decimal_digits, NumberRepresentation::Zoned)
    }

    pub fn packed(entire_digits: u32, decimal_digits: u32) -> Result<Self, TypeError> {
        Self::new(entire_digits, decimal_digits, NumberRepresentation::Packed)
    }

    pub fn integer(digits: u32) -> Result<Self, TypeError> {
        Self::new(digits, 0, NumberRepresentation::Integer)
    }

    #[inline]
    pub fn entire_digits(self) -> u32 {
        self.entire_digits
    }

    #[inline]
    pub fn decimal_digits(self) -> u32 {
        self.decimal_digits
    }

    #[inline]
    pub fn representation(self) -> NumberRepresentation {
        self.representation
    }

    /// Total number of digits.
    #[inline]
    pub fn digits(self) -> u32 {
        self.entire_digits + self.decimal_digits
    }

    /// True when there are no decimal digits.
    #[inline]
    pub fn is_integer(self) -> bool {
        self.decimal_digits == 0
    }

    /// Storage size in bytes, per the representation's band table.
    pub fn size(self) -> usize {
        let digits = self.digits() as usize;
        match self.representation {
            NumberRepresentation::Zoned => digits,
            NumberRepresentation::Packed => (digits + 2) / 2,
            NumberRepresentation::Binary => {
                if digits <= 4 {
                    2
                } else {
                    4
                }
            }
            NumberRepresentation::Integer | NumberRepresentation::Unsigned => match digits {
                0..=3 => 1,
                4..=5 => 2,
                6..=10 => 4,
                _ => 8,
            },
        }
    }

    /// Pointwise digit comparison: both parts of `source` must fit.
    pub fn can_be_assigned(self, source: NumberType) -> bool {
        source.entire_digits <= self.entire_digits && source.decimal_digits <= self.decimal_digits
    }

    /// Result type of arithmetic between two numbers: the maximum of each part.
    pub fn widen(self, other: NumberType) -> Result<NumberType, TypeError> {
        NumberType::zoned(
            self.entire_digits.max(other.entire_digits),
            self.decimal_digits.max(other.decimal_digits),
        )
    }
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {})",
            self.representation.as_str(),
            self.entire_digits,
            self.decimal_digits
        )
    }
}

/// Fixed-size array.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayType {
    pub element: Box<Type>,
    pub count: usize,
}

/// A named subfield inside a data structure, at a byte offset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldType {
    pub name: String,
    pub ty: Type,
    pub start: usize,
}

/// Data structure layout: subfields overlaid on one buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataStructureType {
    pub fields: Vec<FieldType>,
    pub element_size: usize,
}

impl DataStructureType {
    /// Look up a subfield (case-insensitive).
    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }
}

/// A supported data type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    String(StringType),
    Number(NumberType),
    Character(usize),
    Boolean,
    Array(ArrayType),
    DataStructure(DataStructureType),
    TimeStamp,
    HiVal,
    LowVal,
    /// Target-less figurative constant (`*BLANKS`, `*ZEROS`...).
    Figurative,
    KList,
}

impl Type {
    /// Storage size in bytes.
    ///
    /// Fails with [`TypeError::VariableSize`] for `*HIVAL` and `*LOVAL`.
    pub fn size(&self) -> Result<usize, TypeError> {
        Ok(match self {
            Type::String(string) => string.length,
            Type::Number(number) => number.size(),
            Type::Character(chars) => *chars,
            Type::Boolean => 1,
            Type::Array(array) => array.element.size()? * array.count,
            Type::DataStructure(ds) => ds.element_size,
            Type::TimeStamp => TIMESTAMP_SIZE,
            Type::Figurative | Type::KList => 0,
            Type::HiVal | Type::LowVal => {
                return Err(TypeError::VariableSize {
                    type_name: self.to_string(),
                })
            }
        })
    }

    pub fn number_of_elements(&self) -> usize {
        match self {
            Type::Array(array) => array.count,
            _ => 1,
        }
    }

    /// Size of one element; for non-arrays this is the whole size.
    pub fn element_size(&self) -> Result<usize, TypeError> {
        match self {
            Type::Array(array) => array.element.size(),
            _ => self.size(),
        }
    }

    /// Wrap this type as the element of an `n`-element array.
    #[must_use]
    pub fn to_array(&self, count: usize) -> Type {
        Type::Array(ArrayType {
            element: Box::new(self.clone()),
            count,
        })
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn as_array(&self) -> Result<&ArrayType, TypeError> {
        match self {
            Type::Array(array) => Ok(array),
            _ => Err(TypeError::NotAnArray {
                type_name: self.to_string(),
            }),
        }
    }

    #[inline]
    pub fn has_variable_size(&self) -> bool {
        matches!(self, Type::HiVal | Type::LowVal)
    }

    /// Element type for arrays, the type itself otherwise.
    pub fn base_type(&self) -> &Type {
        match self {
            Type::Array(array) => &array.element,
            _ => self,
        }
    }

    /// Whether a value of type `source` may be assigned to this type.
    ///
    /// Numbers compare digit parts pointwise, figuratives accept anything,
    /// everything else requires equality.
    pub fn can_be_assigned(&self, source: &Type) -> bool {
        match (self, source) {
            (Type::Number(target), Type::Number(source)) => target.can_be_assigned(*source),
            (Type::Number(_), _) => false,
            (Type::Figurative, _) => true,
            (Type::KList, _) => false,
            _ => self == source,
        }
    }

    pub fn as_number(&self) -> Option<NumberType> {
        match self {
            Type::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl From<NumberType> for Type {
    fn from(number: NumberType) -> Self {
        Type::Number(number)
    }
}

impl From<StringType> for Type {
    fn from(string: StringType) -> Self {
        Type::String(string)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String(string) if string.varying => write!(f, "varying({})", string.length),
            Type::String(string) => write!(f, "string({})", string.length),
            Type::Number(number) => write!(f, "{number}"),
            Type::Character(chars) => write!(f, "character({chars})"),
            Type::Boolean => write!(f, "boolean"),
            Type::Array(array) => write!(f, "array({}, {})", array.element, array.count),
            Type::DataStructure(ds) => write!(f, "data structure({})", ds.element_size),
            Type::TimeStamp => write!(f, "timestamp"),
            Type::HiVal => write!(f, "*HIVAL"),
            Type::LowVal => write!(f, "*LOVAL"),
            Type::Figurative => write!(f, "figurative"),
            Type::KList => write!(f, "klist"),
        }
    }
}

#[cfg(test)]
mod tests;
