#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::definitions::DataKey;
use pretty_assertions::assert_eq;

fn number(entire: u32, decimal: u32) -> Type {
    Type::Number(NumberType::zoned(entire, decimal).unwrap())
}

fn var(key: u32, name: &str, ty: Type) -> Expression {
    Expression::data_ref(Arc::new(DataDefinition::new(DataKey::new(key), name, ty)))
}

#[test]
fn literal_types() {
    assert_eq!(Expression::string("ABC").ty().unwrap(), varying(3));
    assert_eq!(Expression::IntLiteral(-1234).ty().unwrap(), number(4, 0));
    assert_eq!(
        Expression::RealLiteral("12.345".parse().unwrap()).ty().unwrap(),
        number(2, 3)
    );
    assert_eq!(
        Expression::RealLiteral("0.5".parse().unwrap()).ty().unwrap(),
        number(0, 1)
    );
}

#[test]
fn plus_widens_to_max_of_each_part() {
    let sum = Expression::binary(
        BinaryOp::Add,
        var(1, "A", number(7, 0)),
        var(2, "B", number(2, 3)),
    );
    assert_eq!(sum.ty().unwrap(), number(7, 3));

    let product = Expression::binary(
        BinaryOp::Mul,
        Expression::IntLiteral(5),
        Expression::RealLiteral("1.25".parse().unwrap()),
    );
    assert_eq!(product.ty().unwrap(), number(1, 2));
}

#[test]
fn division_is_not_inferable() {
    let quotient = Expression::binary(
        BinaryOp::Div,
        Expression::IntLiteral(1),
        Expression::IntLiteral(3),
    );
    assert!(matches!(
        quotient.ty(),
        Err(TypeError::NotInferable { .. })
    ));
}

#[test]
fn mixed_sum_is_not_inferable() {
    let sum = Expression::binary(BinaryOp::Add, Expression::IntLiteral(1), Expression::string("A"));
    assert!(sum.ty().is_err());
}

#[test]
fn string_concatenation_is_varying() {
    let concat = Expression::binary(
        BinaryOp::Add,
        var(1, "X", Type::String(StringType::fixed(5))),
        Expression::string("1"),
    );
    assert_eq!(concat.ty().unwrap(), varying(6));
}

#[test]
fn array_access_yields_element_type() {
    let array = var(1, "ARR", number(3, 0).to_array(10));
    let access = Expression::array_access(array, Expression::IntLiteral(2));
    assert_eq!(access.ty().unwrap(), number(3, 0));

    let scalar = Expression::array_access(var(2, "S", number(3, 0)), Expression::IntLiteral(1));
    assert!(matches!(scalar.ty(), Err(TypeError::NotAnArray { .. })));
}

#[test]
fn figuratives_and_booleans() {
    assert_eq!(
        Expression::Figurative(FigurativeConstant::HiVal).ty().unwrap(),
        Type::HiVal
    );
    assert_eq!(
        Expression::Figurative(FigurativeConstant::Blanks).ty().unwrap(),
        Type::Figurative
    );
    assert_eq!(
        Expression::Figurative(FigurativeConstant::On).ty().unwrap(),
        Type::Boolean
    );
    let cmp = Expression::binary(BinaryOp::Lt, Expression::IntLiteral(1), Expression::string("x"));
    assert_eq!(cmp.ty().unwrap(), Type::Boolean);
}

#[test]
fn built_in_types() {
    let field = var(1, "F", Type::String(StringType::fixed(8)));
    assert_eq!(
        Expression::built_in(BuiltInFunction::Trim, field.clone()).ty().unwrap(),
        varying(8)
    );
    assert_eq!(
        Expression::built_in(BuiltInFunction::Len, field).ty().unwrap(),
        number(10, 0)
    );
    assert_eq!(
        Expression::built_in(BuiltInFunction::Char, var(2, "N", number(5, 2)))
            .ty()
            .unwrap(),
        varying(9)
    );
}

#[test]
fn compilation_unit_lookup() {
    let mut unit = CompilationUnit::new("PGM");
    unit.data_definitions.push(Arc::new(DataDefinition::new(
        DataKey::new(1),
        "Total",
        number(5, 0),
    )));
    assert!(unit.data_definition("TOTAL").is_some());
    assert!(unit.data_definition("OTHER").is_none());
}
