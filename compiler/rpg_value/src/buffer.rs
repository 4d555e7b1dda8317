//! Data structure overlays.
//!
//! A data structure is one character buffer. Subfields, nested structures
//! and in-line arrays are offset views into that same buffer, so a write
//! through any view is visible through every other view and the parent.
//!
//! Clones of a [`DataStructValue`] share the buffer. Use
//! [`DataStructValue::detached`] for an independent copy.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rpg_ir::{DataStructureType, Type};

use crate::encoding::{decode, encode};
use crate::errors::{index_out_of_bounds, EvalError};
use crate::value::{ArrayValue, Value};

/// Shared character storage of a data structure.
pub type SharedBuffer = Arc<RwLock<Vec<char>>>;

fn new_buffer(chars: Vec<char>) -> SharedBuffer {
    Arc::new(RwLock::new(chars))
}

/// A data structure value: `len` characters of a shared buffer at `start`.
#[derive(Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub struct DataStructValue {
    buffer: SharedBuffer,
    start: usize,
    len: usize,
}

impl DataStructValue {
    /// A blank structure of `len` characters.
    pub fn new(len: usize) -> Self {
        Self::from_chars(vec![' '; len])
    }

    /// A structure owning `text`, padded with blanks or truncated to `len`.
    pub fn from_text(text: &str, len: usize) -> Self {
        let mut chars: Vec<char> = text.chars().take(len).collect();
        chars.resize(len, ' ');
        Self::from_chars(chars)
    }

    fn from_chars(chars: Vec<char>) -> Self {
        let len = chars.len();
        Self {
            buffer: new_buffer(chars),
            start: 0,
            len,
        }
    }

    /// A structure whose subfields all hold their blank values.
    pub fn blank(ty: &DataStructureType) -> Result<Self, EvalError> {
        let ds = Self::new(ty.element_size);
        for field in &ty.fields {
            let blank = Value::blank(&field.ty)?;
            ds.view(field.start, &field.ty)?.write(&blank)?;
        }
        Ok(ds)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full content as text.
    pub fn text(&self) -> String {
        self.read_chars(0, self.len).into_iter().collect()
    }

    /// Copy `len` characters starting at `offset`.
    pub fn read_chars(&self, offset: usize, len: usize) -> Vec<char> {
        let buffer = self.buffer.read();
        let from = (self.start + offset).min(buffer.len());
        let to = (from + len).min(buffer.len());
        buffer[from..to].to_vec()
    }

    /// Overwrite characters starting at `offset`, clipped to this structure.
    pub fn write_chars(&self, offset: usize, chars: &[char]) {
        let available = self.len.saturating_sub(offset);
        let count = chars.len().min(available);
        if count == 0 {
            return;
        }
        let mut buffer = self.buffer.write();
        let from = self.start + offset;
        buffer[from..from + count].copy_from_slice(&chars[..count]);
    }

    /// Replace the whole content with `other`'s, padded or truncated.
    pub fn assign(&self, other: &DataStructValue) {
        let mut chars = other.read_chars(0, other.len);
        chars.resize(self.len, ' ');
        self.write_chars(0, &chars);
    }

    /// View of `ty` at `offset` within this structure.
    pub fn view(&self, offset: usize, ty: &Type) -> Result<FieldView, EvalError> {
        let len = ty.size()?;
        if offset + len > self.len {
            return Err(EvalError::new(format!(
                "field of {len} characters at {offset} exceeds data structure of {}",
                self.len
            )));
        }
        Ok(FieldView {
            buffer: Arc::clone(&self.buffer),
            start: self.start + offset,
            len,
            ty: ty.clone(),
        })
    }

    /// Independent copy of the content.
    #[must_use]
    pub fn detached(&self) -> DataStructValue {
        Self::from_chars(self.read_chars(0, self.len))
    }

    /// True when both values are views over the same buffer.
    pub fn shares_buffer(&self, other: &DataStructValue) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl PartialEq for DataStructValue {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.read_chars(0, self.len) == other.read_chars(0, other.len)
    }
}

impl fmt::Debug for DataStructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStructValue")
            .field("start", &self.start)
            .field("len", &self.len)
            .field("text", &self.text())
            .finish()
    }
}

impl From<DataStructValue> for String {
    fn from(ds: DataStructValue) -> Self {
        ds.text()
    }
}

impl From<String> for DataStructValue {
    fn from(text: String) -> Self {
        let len = text.chars().count();
        Self::from_text(&text, len)
    }
}

/// A typed window onto a shared buffer.
#[derive(Clone)]
pub struct FieldView {
    buffer: SharedBuffer,
    start: usize,
    len: usize,
    ty: Type,
}

impl FieldView {
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Current value of the field.
    ///
    /// Arrays and nested structures come back as live views; scalars are
    /// decoded from the buffer.
    pub fn read(&self) -> Value {
        match &self.ty {
            Type::Array(array) => {
                let stride = array.element.size().unwrap_or(0);
                Value::Array(ArrayValue::Projected(ProjectedArray {
                    buffer: Arc::clone(&self.buffer),
                    start: self.start,
                    stride,
                    count: array.count,
                    element_type: (*array.element).clone(),
                }))
            }
            Type::DataStructure(_) => Value::DataStruct(DataStructValue {
                buffer: Arc::clone(&self.buffer),
                start: self.start,
                len: self.len,
            }),
            ty => {
                let chars = self.buffer.read()[self.start..self.start + self.len].to_vec();
                decode(&chars, ty)
            }
        }
    }

    /// Coerce `value` to the field type and write its encoding.
    pub fn write(&self, value: &Value) -> Result<(), EvalError> {
        let coerced = value.for_type(&self.ty)?;
        // Encode before locking: the value may itself be a view of this buffer.
        let chars = encode(&coerced, &self.ty)?;
        let mut buffer = self.buffer.write();
        let count = chars.len().min(self.len);
        buffer[self.start..self.start + count].copy_from_slice(&chars[..count]);
        Ok(())
    }
}

/// An array whose elements are evenly spaced in a data structure buffer.
#[derive(Clone)]
pub struct ProjectedArray {
    buffer: SharedBuffer,
    start: usize,
    stride: usize,
    count: usize,
    element_type: Type,
}

impl ProjectedArray {
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn element_type(&self) -> &Type {
        &self.element_type
    }

    fn element_view(&self, index: usize) -> Result<FieldView, EvalError> {
        if index >= self.count {
            return Err(index_out_of_bounds(
                i64::try_from(index).unwrap_or(i64::MAX).saturating_add(1),
                self.count,
            ));
        }
        Ok(FieldView {
            buffer: Arc::clone(&self.buffer),
            start: self.start + index * self.stride,
            len: self.stride,
            ty: self.element_type.clone(),
        })
    }

    /// Element at a zero-based index.
    pub fn get(&self, index: usize) -> Result<Value, EvalError> {
        Ok(self.element_view(index)?.read())
    }

    /// Write the element at a zero-based index into the buffer.
    pub fn set(&self, index: usize, value: &Value) -> Result<(), EvalError> {
        self.element_view(index)?.write(value)
    }

    /// Detached copies of all elements.
    pub fn snapshot(&self) -> Vec<Value> {
        (0..self.count)
            .filter_map(|index| self.get(index).ok())
            .map(|value| value.detached())
            .collect()
    }
}

impl fmt::Debug for ProjectedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectedArray")
            .field("start", &self.start)
            .field("stride", &self.stride)
            .field("count", &self.count)
            .field("element_type", &self.element_type)
            .finish()
    }
}
