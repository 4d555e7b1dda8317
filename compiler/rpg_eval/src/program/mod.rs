//! Program lifecycle: one invocation from symbol table to retained state.
//!
//! ```text
//! resolve activation group → push frame
//!   → blank symbol table → INZ values
//!   → restore retained values (activation group state, else storage)
//!   → bind entry parameters → on_enter_pgm
//!   → run → on_exit_pgm
//!   → retain (RT) | discard (LR)
//! → pop frame
//! ```

mod builder;

use std::sync::Arc;

use rpg_ir::{AbstractDataDefinition, CompilationUnit, Indicator};
use rpg_value::{not_found, EvalError, Value};

use crate::activation_group::resolve_activation_group;
use crate::call_stack::CallFrame;
use crate::configuration::Configuration;
use crate::context::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::log::LogEntry;
use crate::memory_slice::{MemorySliceId, SliceValues};
use crate::symbol_table::SymbolTable;
use crate::system_interface::SystemInterface;

pub use builder::ProgramBuilder;

/// Entry parameters after a call, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct CallResult {
    pub params: Vec<(String, Value)>,
}

impl CallResult {
    /// Value of the entry parameter `name` (case-insensitive).
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(param, _)| param.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

/// A resolved program, ready to run.
#[derive(Clone, Debug)]
pub struct Program {
    unit: Arc<CompilationUnit>,
}

impl Program {
    pub fn from_unit(unit: CompilationUnit) -> Self {
        Self {
            unit: Arc::new(unit),
        }
    }

    pub fn name(&self) -> &str {
        &self.unit.name
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    /// Run this program as the main program of a new execution.
    ///
    /// `params` are bound to the entry parameters by name.
    #[tracing::instrument(level = "debug", skip_all, fields(program = %self.name()))]
    pub fn single_call(
        &self,
        params: &[(&str, Value)],
        configuration: Configuration,
        system_interface: Arc<dyn SystemInterface>,
    ) -> Result<CallResult, EvalError> {
        let params = params
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        ExecutionContext::execute(configuration, system_interface, || self.call(params, None))
    }

    /// Invoke the program inside the current execution.
    ///
    /// `caller_group` is the caller's activation group, `None` for the
    /// main program.
    pub(crate) fn call(
        &self,
        params: Vec<(String, Value)>,
        caller_group: Option<&str>,
    ) -> Result<CallResult, EvalError> {
        let system = ExecutionContext::system_interface().ok_or_else(|| {
            EvalError::new(format!(
                "{} called outside an execution context",
                self.name()
            ))
        })?;
        let configuration = ExecutionContext::configuration();
        let name = self.name();
        let activation_group = resolve_activation_group(
            name,
            self.unit.activation_group.as_ref(),
            caller_group,
            &configuration,
        );

        ExecutionContext::with_call_stack(|stack| {
            stack.push(CallFrame {
                program: name.to_string(),
                activation_group: activation_group.clone(),
            })
        })?;
        let _frame = FrameGuard {
            previous_program: ExecutionContext::set_program_name(Some(name.to_string())),
        };
        tracing::debug!(program = name, %activation_group, "enter program");
        ExecutionContext::log(&LogEntry::ProgramStart {
            program: name.to_string(),
            activation_group: activation_group.clone(),
        });

        self.run(&activation_group, params, &configuration, system.as_ref())
            .map_err(|err| ExecutionContext::with_call_stack(|stack| stack.attach_backtrace(err)))
    }

    fn run(
        &self,
        activation_group: &str,
        params: Vec<(String, Value)>,
        configuration: &Configuration,
        system: &dyn SystemInterface,
    ) -> Result<CallResult, EvalError> {
        let name = self.name();
        let slice_id = MemorySliceId::new(activation_group, name);
        let mut table = self.blank_symbol_table()?;
        Interpreter::new(name, activation_group, &mut table, system)
            .initialize(&self.unit.data_definitions)?;
        restore(&mut table, &slice_id)?;
        self.bind_params(&mut table, params)?;

        (configuration.callbacks.on_enter_pgm)(name, &table);
        let outcome = {
            let mut interpreter = Interpreter::new(name, activation_group, &mut table, system);
            interpreter
                .run(&self.unit.main)
                .map(|()| interpreter.indicator(Indicator::Lr))
        };
        (configuration.callbacks.on_exit_pgm)(name, &table, outcome.as_ref().err());
        let last_record = outcome?;

        let retained = (configuration.callbacks.exit_in_rt)(name).unwrap_or(!last_record);
        if retained {
            retain(&table, slice_id);
        } else {
            discard(slice_id);
        }
        tracing::debug!(program = name, retained, "exit program");
        ExecutionContext::log(&LogEntry::ProgramEnd {
            program: name.to_string(),
            retained,
        });
        self.call_result(&table)
    }

    /// Every definition and entry parameter, holding its blank value.
    fn blank_symbol_table(&self) -> Result<SymbolTable, EvalError> {
        let mut table = SymbolTable::new();
        for data in self.unit.data_definitions.iter().chain(&self.unit.entry_params) {
            let definition = AbstractDataDefinition::Data(Arc::clone(data));
            if !table.contains(&definition) {
                table.set(&definition, Value::blank(&data.ty)?)?;
            }
        }
        Ok(table)
    }

    fn bind_params(
        &self,
        table: &mut SymbolTable,
        params: Vec<(String, Value)>,
    ) -> Result<(), EvalError> {
        for (name, value) in params {
            let entry = self
                .unit
                .entry_params
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| not_found(&name))?;
            table.set(&AbstractDataDefinition::Data(Arc::clone(entry)), value)?;
        }
        Ok(())
    }

    fn call_result(&self, table: &SymbolTable) -> Result<CallResult, EvalError> {
        let params = self
            .unit
            .entry_params
            .iter()
            .map(|entry| {
                let value = table.get(&AbstractDataDefinition::Data(Arc::clone(entry)))?;
                Ok((entry.name.clone(), value.detached()))
            })
            .collect::<Result<_, EvalError>>()?;
        Ok(CallResult { params })
    }
}

/// Pops the program's frame and restores the caller's name.
struct FrameGuard {
    previous_program: Option<String>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        ExecutionContext::with_call_stack(|stack| {
            stack.pop();
        });
        ExecutionContext::set_program_name(self.previous_program.take());
    }
}

/// Apply the values retained for `id`.
///
/// The first call of a program in an execution reads the storage (when
/// one is configured); later calls see what the previous call retained.
fn restore(table: &mut SymbolTable, id: &MemorySliceId) -> Result<(), EvalError> {
    let retained =
        ExecutionContext::with_activation_groups(|groups| groups.get(id).cloned()).flatten();
    let values = match retained {
        Some(values) => values,
        None => {
            let loaded = ExecutionContext::with_memory_slice_mgr(|mgr| mgr.load(id))
                .transpose()?
                .map(|values| {
                    ExecutionContext::log(&LogEntry::MemorySliceLoad {
                        id: id.clone(),
                        variables: values.len(),
                    });
                    values
                })
                .unwrap_or_default();
            ExecutionContext::with_activation_groups(|groups| {
                groups.retain(id.clone(), loaded.clone());
            });
            loaded
        }
    };
    for (name, value) in values {
        match table.definition_by_name(&name).cloned() {
            Some(definition) => {
                table.set(&definition, value)?;
            }
            None => tracing::debug!(%id, %name, "retained variable no longer declared"),
        }
    }
    Ok(())
}

/// Top-level values by name, detached from the table's buffers.
fn snapshot(table: &SymbolTable) -> SliceValues {
    table
        .values()
        .into_iter()
        .filter_map(|(definition, value)| match definition {
            AbstractDataDefinition::Data(data) => Some((data.name.clone(), value.detached())),
            AbstractDataDefinition::Field(_) => None,
        })
        .collect()
}

fn retain(table: &SymbolTable, id: MemorySliceId) {
    let values = snapshot(table);
    ExecutionContext::with_memory_slice_mgr(|mgr| mgr.retain(&id, values.clone()));
    ExecutionContext::with_activation_groups(|groups| groups.retain(id, values));
}

fn discard(id: MemorySliceId) {
    ExecutionContext::with_memory_slice_mgr(|mgr| mgr.discard(&id));
    ExecutionContext::with_activation_groups(|groups| groups.discard(id));
}
