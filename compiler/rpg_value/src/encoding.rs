//! Character-buffer encoding of values inside data structures.
//!
//! - zoned: one digit per character, sign folded into the last digit
//!   (`}` and `J`..`R` are negative 0..9)
//! - packed: two BCD digits per character, trailing sign nibble `C`/`D`
//! - binary, integer, unsigned: big-endian bytes, one byte per character
//! - boolean: `1` or `0`
//! - timestamp: its 26-character text form

use chrono::NaiveDateTime;
use rpg_ir::{Decimal, NumberRepresentation, NumberType, Type};

use crate::buffer::DataStructValue;
use crate::coercion::{low_timestamp, number_value};
use crate::errors::{unsupported_coercion, EvalError};
use crate::value::{ArrayValue, StringValue, Value, TIMESTAMP_FORMAT};

const SIGN_POSITIVE: u8 = 0xC;
const SIGN_NEGATIVE: u8 = 0xD;

/// Encode an already-coerced value as exactly `ty.size()` characters.
pub fn encode(value: &Value, ty: &Type) -> Result<Vec<char>, EvalError> {
    let size = ty.size()?;
    let chars = match (ty, value) {
        (Type::String(_) | Type::Character(_), Value::Str(string)) => {
            fixed_chars(&string.value, size)
        }
        (Type::DataStructure(_), Value::DataStruct(ds)) => {
            let mut chars = ds.read_chars(0, ds.len());
            chars.resize(size, ' ');
            chars
        }
        (Type::Number(number), value) => match value.as_decimal() {
            Some(decimal) => encode_number(decimal, *number),
            None => return Err(unsupported_coercion(value, ty)),
        },
        (Type::Boolean, Value::Bool(flag)) => vec![if *flag { '1' } else { '0' }],
        (Type::TimeStamp, Value::Timestamp(timestamp)) => {
            fixed_chars(&timestamp.format(TIMESTAMP_FORMAT).to_string(), size)
        }
        (Type::Array(array_type), Value::Array(array)) => {
            let mut chars = Vec::with_capacity(size);
            for element in array.elements() {
                chars.extend(encode(&element, &array_type.element)?);
            }
            chars.resize(size, ' ');
            chars
        }
        _ => return Err(unsupported_coercion(value, ty)),
    };
    Ok(chars)
}

/// Decode `chars` (exactly `ty.size()` of them) as a value of `ty`.
///
/// Decoding never fails: malformed digits read as zero, the way blank
/// numeric storage reads as zero.
pub fn decode(chars: &[char], ty: &Type) -> Value {
    match ty {
        Type::String(string) if string.varying => {
            let text: String = chars.iter().collect();
            Value::Str(StringValue::varying(text.trim_end()))
        }
        Type::String(_) | Type::Character(_) => Value::string(chars.iter().collect::<String>()),
        Type::Number(number) => number_value(decode_number(chars, *number), *number),
        Type::Boolean => Value::Bool(chars.first() == Some(&'1')),
        Type::TimeStamp => {
            let text: String = chars.iter().collect();
            Value::Timestamp(
                NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
                    .unwrap_or_else(|_| low_timestamp()),
            )
        }
        Type::Array(array) => {
            let stride = array.element.size().unwrap_or(0).max(1);
            let elements = chars
                .chunks(stride)
                .take(array.count)
                .map(|chunk| decode(chunk, &array.element))
                .collect();
            Value::Array(ArrayValue::new(elements, (*array.element).clone()))
        }
        Type::DataStructure(_) => {
            let text: String = chars.iter().collect();
            Value::DataStruct(DataStructValue::from_text(&text, chars.len()))
        }
        Type::HiVal | Type::LowVal | Type::Figurative | Type::KList => {
            Value::string(chars.iter().collect::<String>())
        }
    }
}

fn fixed_chars(text: &str, size: usize) -> Vec<char> {
    let mut chars: Vec<char> = text.chars().take(size).collect();
    chars.resize(size, ' ');
    chars
}

/// Unscaled digits at the type's scale, keeping the low-order `width` digits.
fn digit_string(decimal: Decimal, number: NumberType, width: usize) -> String {
    let scaled = decimal
        .rescale(number.decimal_digits(), rpg_ir::Rounding::Truncate)
        .unwrap_or(decimal);
    let digits = format!("{:0>width$}", scaled.unsigned_digits());
    digits[digits.len() - width..].to_string()
}

fn encode_number(decimal: Decimal, number: NumberType) -> Vec<char> {
    match number.representation() {
        NumberRepresentation::Zoned => encode_zoned(decimal, number),
        NumberRepresentation::Packed => encode_packed(decimal, number),
        NumberRepresentation::Binary
        | NumberRepresentation::Integer
        | NumberRepresentation::Unsigned => encode_binary(decimal, number),
    }
}

fn encode_zoned(decimal: Decimal, number: NumberType) -> Vec<char> {
    let mut chars: Vec<char> = digit_string(decimal, number, number.size())
        .chars()
        .collect();
    if decimal.is_negative() {
        if let Some(last) = chars.last_mut() {
            *last = negative_zone(*last);
        }
    }
    chars
}

fn negative_zone(digit: char) -> char {
    match digit.to_digit(10) {
        Some(0) | None => '}',
        Some(d) => char::from(b'J' + (d as u8 - 1)),
    }
}

/// Digit value and sign of a zoned character.
fn zoned_digit(c: char) -> (u32, bool) {
    match c {
        '0'..='9' => (c as u32 - '0' as u32, false),
        '{' => (0, false),
        '}' => (0, true),
        'A'..='I' => (c as u32 - 'A' as u32 + 1, false),
        'J'..='R' => (c as u32 - 'J' as u32 + 1, true),
        _ => (0, false),
    }
}

fn encode_packed(decimal: Decimal, number: NumberType) -> Vec<char> {
    let size = number.size();
    let digits = digit_string(decimal, number, size * 2 - 1);
    let mut nibbles: Vec<u8> = digits.bytes().map(|b| b - b'0').collect();
    nibbles.push(if decimal.is_negative() {
        SIGN_NEGATIVE
    } else {
        SIGN_POSITIVE
    });
    nibbles
        .chunks(2)
        .map(|pair| char::from((pair[0] << 4) | pair[1]))
        .collect()
}

fn encode_binary(decimal: Decimal, number: NumberType) -> Vec<char> {
    let size = number.size();
    let unscaled = decimal
        .rescale(number.decimal_digits(), rpg_ir::Rounding::Truncate)
        .unwrap_or(decimal)
        .unscaled();
    // Two's complement, low-order `size` bytes.
    let bytes = unscaled.to_be_bytes();
    bytes[bytes.len() - size..]
        .iter()
        .map(|byte| char::from(*byte))
        .collect()
}

fn decode_number(chars: &[char], number: NumberType) -> Decimal {
    let scale = number.decimal_digits();
    let blank = chars.iter().all(|c| *c == ' ');
    let unscaled = match number.representation() {
        NumberRepresentation::Zoned | NumberRepresentation::Packed if blank => 0,
        NumberRepresentation::Zoned => decode_zoned(chars),
        NumberRepresentation::Packed => decode_packed(chars),
        NumberRepresentation::Binary | NumberRepresentation::Integer => decode_binary(chars, true),
        NumberRepresentation::Unsigned => decode_binary(chars, false),
    };
    Decimal::new(unscaled, scale)
}

fn decode_zoned(chars: &[char]) -> i128 {
    let mut negative = false;
    let mut unscaled: i128 = 0;
    for (i, c) in chars.iter().enumerate() {
        let (digit, sign) = zoned_digit(*c);
        if i + 1 == chars.len() {
            negative = sign;
        }
        unscaled = unscaled.saturating_mul(10).saturating_add(i128::from(digit));
    }
    if negative {
        -unscaled
    } else {
        unscaled
    }
}

fn byte_of(c: char) -> u8 {
    (u32::from(c) & 0xFF) as u8
}

fn decode_packed(chars: &[char]) -> i128 {
    let mut unscaled: i128 = 0;
    let mut negative = false;
    let last = chars.len().saturating_sub(1);
    for (i, c) in chars.iter().enumerate() {
        let byte = byte_of(*c);
        let (high, low) = (byte >> 4, byte & 0x0F);
        unscaled = unscaled
            .saturating_mul(10)
            .saturating_add(i128::from(high.min(9)));
        if i == last {
            negative = low == SIGN_NEGATIVE || low == 0xB;
        } else {
            unscaled = unscaled
                .saturating_mul(10)
                .saturating_add(i128::from(low.min(9)));
        }
    }
    if negative {
        -unscaled
    } else {
        unscaled
    }
}

fn decode_binary(chars: &[char], signed: bool) -> i128 {
    let mut raw: u128 = 0;
    for c in chars {
        raw = (raw << 8) | u128::from(byte_of(*c));
    }
    let bits = (chars.len() * 8) as u32;
    if signed && bits > 0 && bits < 128 && raw & (1u128 << (bits - 1)) != 0 {
        // Sign-extend.
        (raw | (u128::MAX << bits)) as i128
    } else {
        raw as i128
    }
}
