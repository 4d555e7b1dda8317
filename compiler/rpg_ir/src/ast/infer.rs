//! Static type inference for expressions.

use crate::decimal::Decimal;
use crate::errors::TypeError;
use crate::types::{NumberType, StringType, Type};

use super::{integer_type, varying, BinaryOp, BuiltInFunction, Expression, FigurativeConstant, UnaryOp};

/// Digits of the display form of `%LEN`.
const LEN_DIGITS: u32 = 10;

pub(super) fn infer(expr: &Expression) -> Result<Type, TypeError> {
    match expr {
        Expression::DataRef(definition) => Ok(definition.ty().clone()),
        Expression::StringLiteral(value) => Ok(varying(value.chars().count())),
        Expression::IntLiteral(value) => integer_type(Decimal::from_i64(*value).precision()),
        Expression::RealLiteral(value) => Ok(Type::Number(NumberType::zoned(
            value.integer_digits(),
            value.scale(),
        )?)),
        Expression::ArrayAccess { array, .. } => {
            let array_type = infer(array)?;
            Ok((*array_type.as_array()?.element).clone())
        }
        Expression::Figurative(constant) => Ok(match constant {
            FigurativeConstant::Blanks | FigurativeConstant::Zeros => Type::Figurative,
            FigurativeConstant::HiVal => Type::HiVal,
            FigurativeConstant::LowVal => Type::LowVal,
            FigurativeConstant::On | FigurativeConstant::Off => Type::Boolean,
        }),
        Expression::Binary { op, left, right } => infer_binary(*op, left, right),
        Expression::Unary {
            op: UnaryOp::Not, ..
        } => Ok(Type::Boolean),
        Expression::Unary {
            op: UnaryOp::Neg,
            operand,
        } => infer(operand),
        Expression::BuiltIn { function, argument } => infer_built_in(*function, argument),
    }
}

fn infer_binary(op: BinaryOp, left: &Expression, right: &Expression) -> Result<Type, TypeError> {
    if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) {
        return Ok(Type::Boolean);
    }
    let left_type = infer(left)?;
    let right_type = infer(right)?;
    match (op, &left_type, &right_type) {
        (BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul, Type::Number(l), Type::Number(r)) => {
            Ok(Type::Number(l.widen(*r)?))
        }
        (BinaryOp::Add, Type::String(l), Type::String(r)) => Ok(Type::String(StringType {
            length: l.length + r.length,
            varying: true,
        })),
        _ => Err(TypeError::NotInferable {
            expression: format!(
                "{left_type} {} {right_type}",
                op.as_symbol()
            ),
        }),
    }
}

fn infer_built_in(function: BuiltInFunction, argument: &Expression) -> Result<Type, TypeError> {
    match function {
        BuiltInFunction::Len => integer_type(LEN_DIGITS),
        BuiltInFunction::Trim => Ok(varying(infer(argument)?.size()?)),
        BuiltInFunction::Char => {
            let ty = infer(argument)?;
            let length = match &ty {
                // Sign and decimal point.
                Type::Number(number) => number.digits() as usize + 2,
                other => other.size()?,
            };
            Ok(varying(length))
        }
    }
}
