//! Program fixtures shared by the integration tests.

#![allow(dead_code, reason = "Each test binary uses a subset of the fixtures")]
#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::Arc;

use rpg_eval::{
    DefaultSystemInterface, InMemoryStorage, MemorySliceId, MemorySliceStorage, Program,
    ProgramBuilder, SystemInterface,
};
use rpg_ir::{
    ActivationGroupSpec, BinaryOp, BuiltInFunction, Expression, Indicator, NumberType, Statement,
    StringType, Type,
};

pub fn fixed(length: usize) -> Type {
    Type::String(StringType::fixed(length))
}

pub fn silent() -> Arc<dyn SystemInterface> {
    Arc::new(DefaultSystemInterface::silent())
}

/// `variable = %TRIM(variable) + suffix`, optionally ending with `SETON LR`.
pub fn appender(
    name: &str,
    group: Option<ActivationGroupSpec>,
    variable: &str,
    suffix: &str,
    last_record: bool,
) -> Program {
    let mut builder = ProgramBuilder::new(name);
    if let Some(group) = group {
        builder.activation_group(group);
    }
    let x = builder.variable(variable, fixed(12));
    builder.statement(Statement::eval(
        Expression::data_ref(Arc::clone(&x)),
        Expression::binary(
            BinaryOp::Add,
            Expression::built_in(BuiltInFunction::Trim, Expression::data_ref(x)),
            Expression::string(suffix),
        ),
    ));
    if last_record {
        builder.statement(Statement::SetOn(Indicator::Lr));
    }
    builder.build()
}

/// `N = N + 1` on a zoned counter.
pub fn counter(name: &str) -> Program {
    let mut builder = ProgramBuilder::new(name);
    let n = builder.variable("N", NumberType::zoned(5, 0).unwrap().into());
    builder.statement(Statement::eval(
        Expression::data_ref(Arc::clone(&n)),
        Expression::binary(BinaryOp::Add, Expression::data_ref(n), Expression::IntLiteral(1)),
    ));
    builder.build()
}

/// Trimmed rendering of `variable` in the slice stored for `(group, program)`.
pub fn stored(
    storage: &dyn MemorySliceStorage,
    group: &str,
    program: &str,
    variable: &str,
) -> Option<String> {
    storage
        .load(&MemorySliceId::new(group, program))
        .unwrap()
        .get(variable)
        .map(|value| value.render().trim_end().to_string())
}

pub fn shared_memory() -> Arc<InMemoryStorage> {
    Arc::new(InMemoryStorage::new())
}
