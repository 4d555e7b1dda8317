//! `ProgramBuilder` for assembling resolved programs in code.
//!
//! Hosts that already hold a resolved AST use [`Program::from_unit`]; the
//! builder is for embedding code and tests, and allocates every
//! definition key from [`ExecutionContext::new_unique_id`].

use std::sync::Arc;

use rpg_ir::{
    ActivationGroupSpec, CompilationUnit, DataDefinition, DataKey, Expression, FieldDeclaration,
    Statement, Type,
};
use rpg_value::EvalError;

use super::Program;
use crate::context::ExecutionContext;

pub struct ProgramBuilder {
    unit: CompilationUnit,
}

impl ProgramBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            unit: CompilationUnit::new(name),
        }
    }

    pub fn activation_group(&mut self, spec: ActivationGroupSpec) -> &mut Self {
        self.unit.activation_group = Some(spec);
        self
    }

    /// Declare a standalone variable.
    pub fn variable(&mut self, name: &str, ty: Type) -> Arc<DataDefinition> {
        self.push(DataDefinition::new(new_key(), name, ty))
    }

    /// Declare a standalone variable with an initial value (`INZ`).
    pub fn variable_with_value(
        &mut self,
        name: &str,
        ty: Type,
        initial: Expression,
    ) -> Arc<DataDefinition> {
        self.push(DataDefinition::new(new_key(), name, ty).with_initial_value(initial))
    }

    /// Declare a data structure whose fields follow one another.
    pub fn data_structure(
        &mut self,
        name: &str,
        qualified: bool,
        fields: &[(&str, Type)],
    ) -> Result<Arc<DataDefinition>, EvalError> {
        let declarations = fields
            .iter()
            .map(|(field, ty)| declaration(field, ty, None))
            .collect();
        self.push_structure(name, qualified, declarations)
    }

    /// Declare a data structure with explicit field offsets (overlays).
    pub fn data_structure_at(
        &mut self,
        name: &str,
        qualified: bool,
        fields: &[(&str, Type, usize)],
    ) -> Result<Arc<DataDefinition>, EvalError> {
        let declarations = fields
            .iter()
            .map(|(field, ty, start)| declaration(field, ty, Some(*start)))
            .collect();
        self.push_structure(name, qualified, declarations)
    }

    /// Declare an entry parameter (`*ENTRY PLIST`).
    pub fn entry_param(&mut self, name: &str, ty: Type) -> Arc<DataDefinition> {
        let param = Arc::new(DataDefinition::new(new_key(), name, ty));
        self.unit.entry_params.push(Arc::clone(&param));
        param
    }

    pub fn statement(&mut self, statement: Statement) -> &mut Self {
        self.unit.main.push(statement);
        self
    }

    pub fn statements(&mut self, statements: impl IntoIterator<Item = Statement>) -> &mut Self {
        self.unit.main.extend(statements);
        self
    }

    pub fn build(self) -> Program {
        Program::from_unit(self.unit)
    }

    fn push(&mut self, data: DataDefinition) -> Arc<DataDefinition> {
        let data = Arc::new(data);
        self.unit.data_definitions.push(Arc::clone(&data));
        data
    }

    fn push_structure(
        &mut self,
        name: &str,
        qualified: bool,
        declarations: Vec<FieldDeclaration>,
    ) -> Result<Arc<DataDefinition>, EvalError> {
        let data = DataDefinition::data_structure(new_key(), name, qualified, declarations)?;
        Ok(self.push(data))
    }
}

fn new_key() -> DataKey {
    DataKey::new(ExecutionContext::new_unique_id())
}

fn declaration(name: &str, ty: &Type, start: Option<usize>) -> FieldDeclaration {
    FieldDeclaration {
        key: new_key(),
        name: name.to_string(),
        ty: ty.clone(),
        start,
    }
}
