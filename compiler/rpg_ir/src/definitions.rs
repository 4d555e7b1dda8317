//! Data definitions: named, typed storage locations.
//!
//! Definitions are resolved once, before execution, and are immutable from
//! then on. Their [`DataKey`] is the identity the symbol table stores values
//! under; names are only a secondary index.

use std::fmt;
use std::sync::Arc;

use crate::ast::Expression;
use crate::errors::{invalid_type_definition, TypeError};
use crate::types::{DataStructureType, FieldType, Type};

/// Dense integer identity of a data definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataKey(u32);

impl DataKey {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A subfield of a data structure.
///
/// The field occupies `start..end` of its container's buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDefinition {
    pub key: DataKey,
    pub name: String,
    pub ty: Type,
    pub container: DataKey,
    pub container_name: String,
    pub start: usize,
    pub end: usize,
    /// Subfield may be referenced without its container prefix.
    pub unqualified_access: bool,
}

impl FieldDefinition {
    #[inline]
    pub fn size(&self) -> usize {
        self.end - self.start
    }
}

/// A top-level definition: standalone variable or data structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataDefinition {
    pub key: DataKey,
    pub name: String,
    pub ty: Type,
    pub fields: Vec<Arc<FieldDefinition>>,
    /// `QUALIFIED` data structures require `DS.FIELD` access.
    pub qualified: bool,
    pub initial_value: Option<Expression>,
}

/// Declaration of one subfield, before offsets are resolved.
#[derive(Clone, Debug)]
pub struct FieldDeclaration {
    pub key: DataKey,
    pub name: String,
    pub ty: Type,
    /// Explicit offset; `None` places the field right after the previous one.
    pub start: Option<usize>,
}

impl DataDefinition {
    /// A standalone variable.
    pub fn new(key: DataKey, name: impl Into<String>, ty: Type) -> Self {
        Self {
            key,
            name: name.into(),
            ty,
            fields: Vec::new(),
            qualified: false,
            initial_value: None,
        }
    }

    #[must_use]
    pub fn with_initial_value(mut self, value: Expression) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// A data structure whose size covers every declared field.
    pub fn data_structure(
        key: DataKey,
        name: impl Into<String>,
        qualified: bool,
        declarations: Vec<FieldDeclaration>,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        let mut next_start = 0;
        let mut element_size = 0;
        let mut field_types = Vec::with_capacity(declarations.len());
        let mut fields = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            let start = declaration.start.unwrap_or(next_start);
            let size = declaration.ty.size()?;
            if size == 0 {
                return Err(invalid_type_definition(format!(
                    "field {} of {name} has no storage",
                    declaration.name
                )));
            }
            let end = start + size;
            next_start = end;
            element_size = element_size.max(end);
            field_types.push(FieldType {
                name: declaration.name.clone(),
                ty: declaration.ty.clone(),
                start,
            });
            fields.push(Arc::new(FieldDefinition {
                key: declaration.key,
                name: declaration.name,
                ty: declaration.ty,
                container: key,
                container_name: name.clone(),
                start,
                end,
                unqualified_access: !qualified,
            }));
        }
        Ok(Self {
            key,
            name,
            ty: Type::DataStructure(DataStructureType {
                fields: field_types,
                element_size,
            }),
            fields,
            qualified,
            initial_value: None,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Arc<FieldDefinition>> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn is_data_structure(&self) -> bool {
        matches!(self.ty, Type::DataStructure(_))
    }
}

/// Either kind of definition, as referenced from expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbstractDataDefinition {
    Data(Arc<DataDefinition>),
    Field(Arc<FieldDefinition>),
}

impl AbstractDataDefinition {
    pub fn key(&self) -> DataKey {
        match self {
            Self::Data(data) => data.key,
            Self::Field(field) => field.key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Data(data) => &data.name,
            Self::Field(field) => &field.name,
        }
    }

    pub fn ty(&self) -> &Type {
        match self {
            Self::Data(data) => &data.ty,
            Self::Field(field) => &field.ty,
        }
    }
}

impl From<Arc<DataDefinition>> for AbstractDataDefinition {
    fn from(data: Arc<DataDefinition>) -> Self {
        Self::Data(data)
    }
}

impl From<Arc<FieldDefinition>> for AbstractDataDefinition {
    fn from(field: Arc<FieldDefinition>) -> Self {
        Self::Field(field)
    }
}
