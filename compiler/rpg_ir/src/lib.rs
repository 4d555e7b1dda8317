//! RPG IR - types, definitions and resolved AST for the RPG runtime.
//!
//! This crate contains the static side of the runtime:
//! - [`Type`] and its variants, with storage sizes and assignability
//! - [`Decimal`], the fixed-point number behind zoned and packed fields
//! - Data and field definitions, keyed by [`DataKey`]
//! - The resolved AST ([`Expression`], [`Statement`], [`CompilationUnit`])
//!
//! Nothing here executes code; evaluation lives in `rpg_eval`.

pub mod ast;
pub mod decimal;
pub mod definitions;
pub mod errors;
pub mod types;

pub use ast::{
    ActivationGroupSpec, BinaryOp, BuiltInFunction, CallParameter, CompilationUnit, Expression,
    FigurativeConstant, Indicator, Statement, UnaryOp,
};
pub use decimal::{Decimal, ParseDecimalError, Rounding};
pub use definitions::{
    AbstractDataDefinition, DataDefinition, DataKey, FieldDeclaration, FieldDefinition,
};
pub use errors::TypeError;
pub use types::{
    ArrayType, DataStructureType, FieldType, NumberLayout, NumberRepresentation, NumberType,
    StringType, Type, TIMESTAMP_SIZE,
};
