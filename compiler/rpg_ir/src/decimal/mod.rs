//! Fixed-point decimal numbers.
//!
//! `Decimal` is an `i128` unscaled value plus a decimal scale, which covers
//! every zoned and packed field the runtime supports (up to 38 digits).
//!
//! Like a checked integer newtype, `Decimal` does NOT implement `Add`, `Sub`,
//! `Mul` or `Div`. Arithmetic goes through checked methods returning
//! `Option<Decimal>`, so overflow can never pass unnoticed.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Maximum number of digits a `Decimal` can carry.
pub const MAX_DIGITS: u32 = 38;

/// How fractional digits are dropped when the scale shrinks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Drop the extra digits (the default assignment semantics).
    #[default]
    Truncate,
    /// Round half away from zero (`EVAL(H)` semantics).
    HalfUp,
}

/// A fixed-point decimal number.
#[derive(Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

/// Error returned when text cannot be read as a decimal number.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{text}` is not a valid decimal number")]
pub struct ParseDecimalError {
    text: String,
}

/// `10^exp`, or `None` when it does not fit an `i128`.
#[inline]
pub fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

impl Decimal {
    /// The zero value, with no fractional digits.
    pub const ZERO: Self = Self {
        unscaled: 0,
        scale: 0,
    };

    /// Create a decimal from its unscaled value and scale.
    ///
    /// `Decimal::new(1250, 2)` is `12.50`.
    #[inline]
    pub const fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    /// Create a decimal holding an integer.
    #[inline]
    pub fn from_i64(value: i64) -> Self {
        Self::new(i128::from(value), 0)
    }

    #[inline]
    pub const fn unscaled(self) -> i128 {
        self.unscaled
    }

    #[inline]
    pub const fn scale(self) -> u32 {
        self.scale
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.unscaled == 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.unscaled < 0
    }

    /// Number of significant digits in the unscaled value (at least 1).
    pub fn precision(self) -> u32 {
        let mut digits = 1;
        let mut rest = self.unscaled.unsigned_abs() / 10;
        while rest > 0 {
            digits += 1;
            rest /= 10;
        }
        digits
    }

    /// Number of digits left of the decimal point.
    pub fn integer_digits(self) -> u32 {
        self.precision().saturating_sub(self.scale)
    }

    /// Change the number of fractional digits.
    ///
    /// Growing the scale zero-extends; shrinking it drops digits according
    /// to `rounding`. Returns `None` if the result does not fit.
    pub fn rescale(self, scale: u32, rounding: Rounding) -> Option<Self> {
        match scale.cmp(&self.scale) {
            Ordering::Equal => Some(self),
            Ordering::Greater => {
                let factor = pow10(scale - self.scale)?;
                Some(Self::new(self.unscaled.checked_mul(factor)?, scale))
            }
            Ordering::Less => {
                let factor = pow10(self.scale - scale)?;
                let quotient = self.unscaled / factor;
                let remainder = self.unscaled % factor;
                let unscaled = match rounding {
                    Rounding::Truncate => quotient,
                    Rounding::HalfUp => {
                        if remainder.unsigned_abs().checked_mul(2)? >= factor.unsigned_abs() {
                            quotient.checked_add(remainder.signum())?
                        } else {
                            quotient
                        }
                    }
                };
                Some(Self::new(unscaled, scale))
            }
        }
    }

    /// Drop all fractional digits, truncating toward zero.
    pub fn trunc(self) -> i128 {
        match pow10(self.scale) {
            Some(factor) => self.unscaled / factor,
            None => 0,
        }
    }

    /// Integer part as an `i64`, or `None` if it does not fit.
    pub fn to_i64(self) -> Option<i64> {
        i64::try_from(self.trunc()).ok()
    }

    /// Bring both operands to the larger of the two scales.
    fn align(self, other: Self) -> Option<(i128, i128, u32)> {
        let scale = self.scale.max(other.scale);
        let left = self.rescale(scale, Rounding::Truncate)?;
        let right = other.rescale(scale, Rounding::Truncate)?;
        Some((left.unscaled, right.unscaled, scale))
    }

    /// Checked addition. Returns `None` on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (left, right, scale) = self.align(rhs)?;
        Some(Self::new(left.checked_add(right)?, scale))
    }

    /// Checked subtraction. Returns `None` on overflow.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let (left, right, scale) = self.align(rhs)?;
        Some(Self::new(left.checked_sub(right)?, scale))
    }

    /// Checked multiplication. The result scale is the sum of both scales.
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        let scale = self.scale.checked_add(rhs.scale)?;
        if scale > MAX_DIGITS {
            return self.checked_mul_reduced(rhs);
        }
        Some(Self::new(self.unscaled.checked_mul(rhs.unscaled)?, scale))
    }

    /// Multiplication whose combined scale exceeds `MAX_DIGITS`: reduce the
    /// operands first so the product scale stays representable.
    fn checked_mul_reduced(self, rhs: Self) -> Option<Self> {
        let half = MAX_DIGITS / 2;
        let left = self.rescale(self.scale.min(half), Rounding::Truncate)?;
        let right = rhs.rescale(rhs.scale.min(half), Rounding::Truncate)?;
        left.checked_mul(right)
    }

    /// Checked division, producing `scale` fractional digits (truncated).
    ///
    /// Returns `None` on division by zero or overflow.
    pub fn checked_div(self, rhs: Self, scale: u32) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        // self / rhs = (a / 10^sa) / (b / 10^sb) = a * 10^(sb + scale - sa) / b / 10^scale
        let shift = i64::from(rhs.scale) + i64::from(scale) - i64::from(self.scale);
        let numerator = if shift >= 0 {
            self.unscaled
                .checked_mul(pow10(u32::try_from(shift).ok()?)?)?
        } else {
            self.unscaled / pow10(u32::try_from(-shift).ok()?)?
        };
        Some(Self::new(numerator.checked_div(rhs.unscaled)?, scale))
    }

    /// Checked negation.
    pub fn checked_neg(self) -> Option<Self> {
        Some(Self::new(self.unscaled.checked_neg()?, self.scale))
    }

    /// Absolute value of the unscaled digits.
    pub fn unsigned_digits(self) -> u128 {
        self.unscaled.unsigned_abs()
    }

    /// Canonical form: trailing fractional zeros removed.
    fn normalized(self) -> Self {
        let mut value = self;
        while value.scale > 0 && value.unscaled % 10 == 0 {
            value.unscaled /= 10;
            value.scale -= 1;
        }
        value
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        if let Some((left, right, _)) = self.align(*other) {
            return left.cmp(&right);
        }
        // Alignment overflowed: compare integer parts, then the fractions.
        let (int_left, int_right) = (self.trunc(), other.trunc());
        if int_left != int_right {
            return int_left.cmp(&int_right);
        }
        let frac = |d: Decimal| pow10(d.scale).map_or(0, |factor| d.unscaled % factor);
        let scale = self.scale.max(other.scale);
        let widen = |value: i128, from: u32| {
            pow10(scale - from).map_or(value, |factor| value.saturating_mul(factor))
        };
        widen(frac(*self), self.scale).cmp(&widen(frac(*other), other.scale))
    }
}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let normalized = self.normalized();
        normalized.unscaled.hash(state);
        normalized.scale.hash(state);
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts an optional sign, digits, and a `.` or `,` decimal mark.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let error = || ParseDecimalError {
            text: text.to_string(),
        };
        let trimmed = text.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match body.find(['.', ',']) {
            Some(pos) => (&body[..pos], &body[pos + 1..]),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(error());
        }
        let mut unscaled: i128 = 0;
        for ch in int_part.chars().chain(frac_part.chars()) {
            let digit = ch.to_digit(10).ok_or_else(error)?;
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(digit)))
                .ok_or_else(error)?;
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| error())?;
        if scale > MAX_DIGITS {
            return Err(error());
        }
        Ok(Self::new(if negative { -unscaled } else { unscaled }, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}
