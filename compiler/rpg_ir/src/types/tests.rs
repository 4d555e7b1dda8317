#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn int_band(digits: u32) -> usize {
    match digits {
        1..=3 => 1,
        4..=5 => 2,
        6..=10 => 4,
        _ => 8,
    }
}

proptest! {
    #[test]
    fn integer_and_unsigned_sizes_follow_bands(digits in 1u32..=20) {
        for repr in [NumberRepresentation::Integer, NumberRepresentation::Unsigned] {
            let ty = NumberType::new(digits, 0, repr).unwrap();
            prop_assert_eq!(ty.size(), int_band(digits));
        }
    }

    #[test]
    fn binary_sizes_follow_bands(entire in 0u32..=9, decimal in 0u32..=9) {
        prop_assume!(entire + decimal >= 1 && entire + decimal <= 9);
        let ty = NumberType::new(entire, decimal, NumberRepresentation::Binary).unwrap();
        let expected = if entire + decimal <= 4 { 2 } else { 4 };
        prop_assert_eq!(ty.size(), expected);
    }

    #[test]
    fn packed_size_is_half_digits_plus_sign(entire in 0u32..=30, decimal in 0u32..=8) {
        prop_assume!(entire + decimal >= 1);
        let ty = NumberType::packed(entire, decimal).unwrap();
        let digits = (entire + decimal) as usize;
        prop_assert_eq!(ty.size(), (digits + 1).div_ceil(2));
    }

    #[test]
    fn zoned_size_is_digit_count(entire in 0u32..=30, decimal in 0u32..=8) {
        prop_assume!(entire + decimal >= 1);
        let ty = NumberType::zoned(entire, decimal).unwrap();
        prop_assert_eq!(ty.size(), (entire + decimal) as usize);
    }

    #[test]
    fn array_size_is_element_times_count(length in 1usize..100, count in 1usize..50) {
        let array = Type::String(StringType::fixed(length)).to_array(count);
        prop_assert_eq!(array.size().unwrap(), length * count);
        prop_assert_eq!(array.element_size().unwrap(), length);
        prop_assert_eq!(array.number_of_elements(), count);
    }
}

#[test]
fn one_past_each_band_is_rejected() {
    let cases = [
        (21, 0, NumberRepresentation::Integer),
        (21, 0, NumberRepresentation::Unsigned),
        (10, 0, NumberRepresentation::Binary),
        (39, 0, NumberRepresentation::Zoned),
        (30, 9, NumberRepresentation::Packed),
    ];
    for (entire, decimal, repr) in cases {
        let err = NumberType::new(entire, decimal, repr).unwrap_err();
        assert!(
            matches!(err, TypeError::InvalidTypeDefinition { .. }),
            "{entire},{decimal} {repr:?} gave {err:?}"
        );
    }
}

#[test]
fn integer_rejects_decimals() {
    assert!(NumberType::new(5, 2, NumberRepresentation::Integer).is_err());
    assert!(NumberType::new(5, 1, NumberRepresentation::Unsigned).is_err());
}

#[test]
fn zero_digits_rejected() {
    assert!(NumberType::zoned(0, 0).is_err());
}

#[test]
fn number_assignability_is_pointwise() {
    let target = NumberType::zoned(5, 2).unwrap();
    assert!(target.can_be_assigned(NumberType::zoned(5, 2).unwrap()));
    assert!(target.can_be_assigned(NumberType::zoned(3, 0).unwrap()));
    assert!(!target.can_be_assigned(NumberType::zoned(6, 0).unwrap()));
    assert!(!target.can_be_assigned(NumberType::zoned(1, 3).unwrap()));
}

#[test]
fn type_assignability() {
    let string = Type::String(StringType::fixed(10));
    assert!(string.can_be_assigned(&Type::String(StringType::fixed(10))));
    assert!(!string.can_be_assigned(&Type::String(StringType::fixed(11))));
    assert!(Type::Figurative.can_be_assigned(&Type::Boolean));
    assert!(!Type::KList.can_be_assigned(&Type::KList));
    assert!(!Type::Number(NumberType::zoned(5, 0).unwrap()).can_be_assigned(&Type::Boolean));
}

#[test]
fn sentinels_have_variable_size() {
    assert!(Type::HiVal.has_variable_size());
    assert!(Type::LowVal.has_variable_size());
    assert!(matches!(
        Type::HiVal.size(),
        Err(TypeError::VariableSize { .. })
    ));
    assert!(!Type::TimeStamp.has_variable_size());
    assert_eq!(Type::TimeStamp.size().unwrap(), 26);
    assert_eq!(Type::Figurative.size().unwrap(), 0);
}

#[test]
fn array_helpers() {
    let element = Type::Number(NumberType::zoned(3, 0).unwrap());
    let array = element.to_array(4);
    assert!(array.is_array());
    assert_eq!(array.as_array().unwrap().count, 4);
    assert_eq!(array.base_type(), &element);
    assert!(element.as_array().is_err());
    assert_eq!(element.base_type(), &element);
    assert_eq!(element.number_of_elements(), 1);
}

#[test]
fn widen_takes_max_of_each_part() {
    let left = NumberType::packed(7, 0).unwrap();
    let right = NumberType::zoned(2, 3).unwrap();
    let widened = left.widen(right).unwrap();
    assert_eq!(widened.entire_digits(), 7);
    assert_eq!(widened.decimal_digits(), 3);
}

#[test]
fn data_structure_field_lookup_ignores_case() {
    let ds = DataStructureType {
        fields: vec![FieldType {
            name: "Code".to_string(),
            ty: Type::String(StringType::fixed(3)),
            start: 2,
        }],
        element_size: 5,
    };
    assert_eq!(ds.field("CODE").map(|f| f.start), Some(2));
    assert!(ds.field("NAME").is_none());
}

#[test]
fn layouts_are_validated_like_new() {
    let layout = |entire, decimal, representation| NumberLayout {
        entire_digits: entire,
        decimal_digits: decimal,
        representation,
    };
    assert_eq!(
        NumberType::try_from(layout(5, 2, NumberRepresentation::Packed)).unwrap(),
        NumberType::packed(5, 2).unwrap()
    );
    for invalid in [
        layout(20, 0, NumberRepresentation::Binary),
        layout(3, 1, NumberRepresentation::Integer),
        layout(0, 0, NumberRepresentation::Zoned),
        layout(21, 0, NumberRepresentation::Unsigned),
    ] {
        assert!(matches!(
            NumberType::try_from(invalid),
            Err(TypeError::InvalidTypeDefinition { .. })
        ));
    }
}
