//! Resolved AST consumed by the interpreter.
//!
//! Every name is already bound to its definition: expressions refer to
//! [`AbstractDataDefinition`]s, never to raw identifiers.

use std::fmt;
use std::sync::Arc;

use crate::decimal::{Decimal, Rounding};
use crate::definitions::{AbstractDataDefinition, DataDefinition};
use crate::errors::TypeError;
use crate::types::{NumberType, StringType, Type};

mod infer;

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    #[inline]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    #[inline]
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Symbolic literals whose representation depends on the target type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FigurativeConstant {
    Blanks,
    HiVal,
    LowVal,
    Zeros,
    On,
    Off,
}

impl fmt::Display for FigurativeConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blanks => "*BLANKS",
            Self::HiVal => "*HIVAL",
            Self::LowVal => "*LOVAL",
            Self::Zeros => "*ZEROS",
            Self::On => "*ON",
            Self::Off => "*OFF",
        })
    }
}

/// Built-in functions (`%TRIM`, `%CHAR`, `%LEN`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltInFunction {
    Trim,
    Char,
    Len,
}

impl BuiltInFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Trim => "%TRIM",
            Self::Char => "%CHAR",
            Self::Len => "%LEN",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    StringLiteral(String),
    IntLiteral(i64),
    RealLiteral(Decimal),
    DataRef(AbstractDataDefinition),
    /// `ARR(index)`, one-based.
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Figurative(FigurativeConstant),
    BuiltIn {
        function: BuiltInFunction,
        argument: Box<Expression>,
    },
}

impl Expression {
    pub fn data_ref(definition: impl Into<AbstractDataDefinition>) -> Self {
        Self::DataRef(definition.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::StringLiteral(value.into())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn array_access(array: Expression, index: Expression) -> Self {
        Self::ArrayAccess {
            array: Box::new(array),
            index: Box::new(index),
        }
    }

    pub fn built_in(function: BuiltInFunction, argument: Expression) -> Self {
        Self::BuiltIn {
            function,
            argument: Box::new(argument),
        }
    }

    /// Static type of the expression.
    pub fn ty(&self) -> Result<Type, TypeError> {
        infer::infer(self)
    }
}

/// Indicators that control how a program ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Last record: discard state on exit.
    Lr,
    /// Return: keep state for the next call.
    Rt,
}

/// A parameter of a `CALL`, passed by reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallParameter {
    pub target: AbstractDataDefinition,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `EVAL target = value`; `EVAL(H)` rounds half up.
    Eval {
        target: Expression,
        value: Expression,
        rounding: Rounding,
    },
    Display(Expression),
    SetOn(Indicator),
    SetOff(Indicator),
    Clear(Expression),
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Call {
        program: Expression,
        params: Vec<CallParameter>,
    },
    Return,
}

impl Statement {
    pub fn eval(target: Expression, value: Expression) -> Self {
        Self::Eval {
            target,
            value,
            rounding: Rounding::Truncate,
        }
    }
}

/// Activation group declared by a program (`ACTGRP` keyword).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActivationGroupSpec {
    Named(String),
    /// `*CALLER`
    Caller,
    /// `*NEW`
    New,
}

/// A resolved program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationUnit {
    pub name: String,
    pub activation_group: Option<ActivationGroupSpec>,
    pub data_definitions: Vec<Arc<DataDefinition>>,
    /// `*ENTRY PLIST` parameters, bound by name on call.
    pub entry_params: Vec<Arc<DataDefinition>>,
    pub main: Vec<Statement>,
}

impl CompilationUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activation_group: None,
            data_definitions: Vec::new(),
            entry_params: Vec::new(),
            main: Vec::new(),
        }
    }

    /// Top-level definition by name (case-insensitive).
    pub fn data_definition(&self, name: &str) -> Option<&Arc<DataDefinition>> {
        self.data_definitions
            .iter()
            .find(|data| data.name.eq_ignore_ascii_case(name))
    }
}

/// `%CHAR`/`%TRIM` results have varying length.
pub(crate) fn varying(length: usize) -> Type {
    Type::String(StringType::varying(length))
}

pub(crate) fn integer_type(digits: u32) -> Result<Type, TypeError> {
    Ok(Type::Number(NumberType::zoned(digits, 0)?))
}

#[cfg(test)]
mod tests;
