//! Tree-walking interpreter for resolved RPG programs.
//!
//! # Architecture
//!
//! An [`Interpreter`] runs the statements of one program invocation against
//! that invocation's [`SymbolTable`]. It owns no program state of its own
//! apart from the indicators; everything else lives in the table, which
//! the program lifecycle (`crate::program`) builds before the run and
//! persists after it.
//!
//! - Expressions are evaluated through [`ensure_sufficient_stack`], so
//!   deeply nested expressions grow the stack instead of overflowing it.
//! - Every assignment goes through [`Value::coerce`] and then
//!   [`SymbolTable::set`]; nothing writes a value that does not fit its
//!   definition.
//! - `CALL` resolves the callee through the [`SystemInterface`] and passes
//!   parameters by reference: values are copied in, and copied back once
//!   the callee returns.

mod builtins;

use std::sync::Arc;

use rpg_ir::{
    AbstractDataDefinition, BinaryOp, CallParameter, DataDefinition, Expression,
    FigurativeConstant, Indicator, Rounding, Statement,
};
use rpg_value::{
    index_out_of_bounds, program_not_found, ArrayValue, EvalError, EvalResult, Value,
};
use rustc_hash::FxHashSet;

use crate::context::ExecutionContext;
use crate::log::LogEntry;
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::stack::ensure_sufficient_stack;
use crate::symbol_table::SymbolTable;
use crate::system_interface::SystemInterface;

use builtins::call_built_in;

/// What the enclosing statement list does next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Flow {
    Next,
    Return,
}

pub struct Interpreter<'a> {
    program: &'a str,
    activation_group: &'a str,
    table: &'a mut SymbolTable,
    system: &'a dyn SystemInterface,
    indicators: FxHashSet<Indicator>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        program: &'a str,
        activation_group: &'a str,
        table: &'a mut SymbolTable,
        system: &'a dyn SystemInterface,
    ) -> Self {
        Self {
            program,
            activation_group,
            table,
            system,
            indicators: FxHashSet::default(),
        }
    }

    pub fn indicator(&self, indicator: Indicator) -> bool {
        self.indicators.contains(&indicator)
    }

    pub fn table(&self) -> &SymbolTable {
        &*self.table
    }

    /// Assign the declared initial value (`INZ`) of every definition.
    pub fn initialize(&mut self, definitions: &[Arc<DataDefinition>]) -> Result<(), EvalError> {
        for data in definitions {
            if let Some(initial) = &data.initial_value {
                let value = self.eval(initial)?;
                self.table
                    .set(&AbstractDataDefinition::Data(Arc::clone(data)), value)?;
            }
        }
        Ok(())
    }

    /// Run `statements` until they end or a `RETURN` executes.
    pub fn run(&mut self, statements: &[Statement]) -> Result<(), EvalError> {
        self.execute_all(statements).map(|_| ())
    }

    fn execute_all(&mut self, statements: &[Statement]) -> Result<Flow, EvalError> {
        for statement in statements {
            if self.execute(statement)? == Flow::Return {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Next)
    }

    fn execute(&mut self, statement: &Statement) -> Result<Flow, EvalError> {
        match statement {
            Statement::Eval {
                target,
                value,
                rounding,
            } => {
                let value = self.eval(value)?;
                let name = self.assign(target, &value, *rounding)?;
                ExecutionContext::log(&LogEntry::Assignment {
                    program: self.program.to_string(),
                    name,
                    value: value.render(),
                });
            }
            Statement::Display(expr) => {
                let text = self.eval(expr)?.render();
                self.system.display(&text);
                ExecutionContext::log(&LogEntry::Display {
                    program: self.program.to_string(),
                    text,
                });
            }
            Statement::SetOn(indicator) => {
                self.indicators.insert(*indicator);
            }
            Statement::SetOff(indicator) => {
                self.indicators.remove(indicator);
            }
            Statement::Clear(target) => {
                let blanks = Value::Figurative(FigurativeConstant::Blanks);
                self.assign(target, &blanks, Rounding::Truncate)?;
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let body = if self.condition(condition)? {
                    then_body
                } else {
                    else_body
                };
                return self.execute_all(body);
            }
            Statement::Call { program, params } => self.call(program, params)?,
            Statement::Return => return Ok(Flow::Return),
        }
        Ok(Flow::Next)
    }

    /// Evaluate an expression.
    pub fn eval(&self, expr: &Expression) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_inner(expr))
    }

    fn eval_inner(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::StringLiteral(value) => Ok(Value::varying(value.as_str())),
            Expression::IntLiteral(value) => Ok(Value::Int(*value)),
            Expression::RealLiteral(value) => Ok(Value::Decimal(*value)),
            Expression::DataRef(definition) => self.table.get(definition),
            Expression::ArrayAccess { array, index } => {
                let position = self.index(index)?;
                match self.eval(array)? {
                    Value::Array(elements) => {
                        elements.get(element_slot(position, elements.len())?)
                    }
                    other => Err(not_an_array(&other)),
                }
            }
            Expression::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => {
                let left = self.eval(left)?;
                match (op, left.as_bool()) {
                    (BinaryOp::And, Some(false)) => Ok(Value::Bool(false)),
                    (BinaryOp::Or, Some(true)) => Ok(Value::Bool(true)),
                    _ => evaluate_binary(left, self.eval(right)?, *op),
                }
            }
            Expression::Binary { op, left, right } => {
                evaluate_binary(self.eval(left)?, self.eval(right)?, *op)
            }
            Expression::Unary { op, operand } => evaluate_unary(&self.eval(operand)?, *op),
            Expression::Figurative(constant) => Ok(Value::Figurative(*constant)),
            Expression::BuiltIn { function, argument } => {
                call_built_in(*function, &self.eval(argument)?, argument)
            }
        }
    }

    fn condition(&self, expr: &Expression) -> Result<bool, EvalError> {
        let value = self.eval(expr)?;
        value.as_bool().ok_or_else(|| {
            EvalError::new(format!(
                "condition must be a boolean, found {}",
                value.describe()
            ))
        })
    }

    /// One-based array index.
    fn index(&self, expr: &Expression) -> Result<i64, EvalError> {
        let value = self.eval(expr)?;
        value.as_i64().ok_or_else(|| {
            EvalError::new(format!(
                "array index must be numeric, found {}",
                value.describe()
            ))
        })
    }

    /// Store `value` into `target`; returns the name the assignment is
    /// logged under.
    fn assign(
        &mut self,
        target: &Expression,
        value: &Value,
        rounding: Rounding,
    ) -> Result<String, EvalError> {
        match target {
            Expression::DataRef(definition) => {
                let coerced = value.coerce(definition.ty(), rounding)?;
                self.table.set(definition, coerced)?;
                Ok(definition.name().to_string())
            }
            Expression::ArrayAccess { array, index } => {
                let Expression::DataRef(definition) = array.as_ref() else {
                    return Err(not_assignable(target));
                };
                let position = self.index(index)?;
                let mut elements = match self.table.get(definition)? {
                    Value::Array(elements) => elements,
                    other => return Err(not_an_array(&other)),
                };
                let slot = element_slot(position, elements.len())?;
                let coerced = value.coerce(elements.element_type(), rounding)?;
                elements.set(slot, &coerced)?;
                // A projected array already wrote through to its structure.
                if let ArrayValue::Concrete { .. } = elements {
                    self.table.set(definition, Value::Array(elements))?;
                }
                Ok(format!("{}({position})", definition.name()))
            }
            _ => Err(not_assignable(target)),
        }
    }

    fn call(&mut self, program: &Expression, params: &[CallParameter]) -> Result<(), EvalError> {
        let name = self.eval(program)?.render().trim().to_uppercase();
        let callee = self
            .system
            .find_program(&name)
            .ok_or_else(|| program_not_found(&name))?;
        let expected = callee.unit().entry_params.len();
        if params.len() != expected {
            return Err(parameter_count_mismatch(&name, expected, params.len()));
        }
        ExecutionContext::log(&LogEntry::Call {
            caller: self.program.to_string(),
            callee: name,
        });
        let mut arguments = Vec::with_capacity(params.len());
        for (param, entry) in params.iter().zip(&callee.unit().entry_params) {
            let value = self.table.get(&param.target)?.detached();
            arguments.push((entry.name.clone(), value));
        }
        let result = callee.call(arguments, Some(self.activation_group))?;
        for (param, (_, value)) in params.iter().zip(result.params) {
            self.table.set(&param.target, value)?;
        }
        Ok(())
    }
}

/// Zero-based slot of a one-based `position`.
fn element_slot(position: i64, len: usize) -> Result<usize, EvalError> {
    usize::try_from(position)
        .ok()
        .filter(|position| (1..=len).contains(position))
        .map(|position| position - 1)
        .ok_or_else(|| index_out_of_bounds(position, len))
}

#[cold]
fn parameter_count_mismatch(program: &str, expected: usize, passed: usize) -> EvalError {
    EvalError::new(format!(
        "{program} expects {expected} parameters, {passed} passed"
    ))
}

#[cold]
fn not_an_array(value: &Value) -> EvalError {
    EvalError::new(format!("{} is not an array", value.describe()))
}

#[cold]
fn not_assignable(target: &Expression) -> EvalError {
    EvalError::new(format!("{target:?} cannot be assigned"))
}
