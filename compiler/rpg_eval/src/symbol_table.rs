//! Symbol table: the current value of every data definition.
//!
//! Values are stored densely by [`DataKey`], never by name. A
//! case-insensitive name index sits on top for lookups by name.
//!
//! Subfields of a data structure have no slot of their own: reading or
//! writing one goes through the container's buffer, so the field and the
//! structure always agree.

use std::sync::Arc;

use rpg_ir::{AbstractDataDefinition, DataDefinition, DataKey, FieldDefinition};
use rpg_value::{key_collision, not_found, EvalError, Value};
use rustc_hash::FxHashMap;

/// A definition together with the value it currently holds.
#[derive(Clone, Debug)]
struct Binding {
    definition: AbstractDataDefinition,
    value: Value,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    /// Indexed by `DataKey::index()`.
    values: Vec<Option<Binding>>,
    /// Upper-cased name to definition.
    names: FxHashMap<String, AbstractDataDefinition>,
    len: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level bindings.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when `definition` (or, for a field, its container) holds a value.
    pub fn contains(&self, definition: &AbstractDataDefinition) -> bool {
        let key = match definition {
            AbstractDataDefinition::Data(data) => data.key,
            AbstractDataDefinition::Field(field) => field.container,
        };
        self.binding(key).is_some()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.definition_by_name(name).is_some()
    }

    /// Definition last stored under `name` (case-insensitive).
    pub fn definition_by_name(&self, name: &str) -> Option<&AbstractDataDefinition> {
        self.names.get(&name.to_uppercase())
    }

    /// Current value of `definition`.
    ///
    /// A field reads through its container: scalars are decoded from the
    /// buffer, arrays and nested structures come back as live views.
    pub fn get(&self, definition: &AbstractDataDefinition) -> Result<Value, EvalError> {
        match definition {
            AbstractDataDefinition::Data(data) => self.get_data(data),
            AbstractDataDefinition::Field(field) => self.get_field(field),
        }
    }

    /// Value by name: top-level definitions first, then unqualified
    /// subfields of any stored data structure.
    ///
    /// When several structures declare a subfield with the same name, the
    /// structure with the lowest key wins.
    pub fn get_by_name(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(definition) = self.definition_by_name(name) {
            return self.get(definition);
        }
        for binding in self.values.iter().flatten() {
            let AbstractDataDefinition::Data(data) = &binding.definition else {
                continue;
            };
            let field = data
                .fields
                .iter()
                .find(|field| field.unqualified_access && field.name.eq_ignore_ascii_case(name));
            if let (Some(field), Value::DataStruct(ds)) = (field, &binding.value) {
                return Ok(ds.view(field.start, &field.ty)?.read());
            }
        }
        Err(not_found(name))
    }

    /// Store `value` for `definition`, coerced to the declared type.
    ///
    /// Returns the previous value. A data structure that already holds a
    /// buffer keeps it and receives a copy of the new contents, so views
    /// handed out earlier stay valid.
    pub fn set(
        &mut self,
        definition: &AbstractDataDefinition,
        value: Value,
    ) -> Result<Option<Value>, EvalError> {
        let coerced = value.for_type(definition.ty())?;
        tracing::trace!(name = definition.name(), value = %coerced, "assign");
        let previous = match definition {
            AbstractDataDefinition::Data(data) => self.set_data(data, coerced)?,
            AbstractDataDefinition::Field(field) => Some(self.set_field(field, &coerced)?),
        };
        self.names
            .insert(definition.name().to_uppercase(), definition.clone());
        Ok(previous)
    }

    /// All top-level bindings, in ascending key order.
    pub fn values(&self) -> Vec<(AbstractDataDefinition, Value)> {
        self.values
            .iter()
            .flatten()
            .map(|binding| (binding.definition.clone(), binding.value.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.names.clear();
        self.len = 0;
    }

    fn binding(&self, key: DataKey) -> Option<&Binding> {
        self.values.get(key.index()).and_then(Option::as_ref)
    }

    fn get_data(&self, data: &DataDefinition) -> Result<Value, EvalError> {
        let binding = self
            .binding(data.key)
            .ok_or_else(|| not_found(&data.name))?;
        if !binding.definition.name().eq_ignore_ascii_case(&data.name) {
            return Err(key_collision(
                data.key.raw(),
                binding.definition.name(),
                &data.name,
            ));
        }
        Ok(binding.value.clone())
    }

    fn get_field(&self, field: &FieldDefinition) -> Result<Value, EvalError> {
        let binding = self
            .binding(field.container)
            .ok_or_else(|| not_found(&field.container_name))?;
        match &binding.value {
            Value::DataStruct(ds) => Ok(ds.view(field.start, &field.ty)?.read()),
            other => Err(EvalError::new(format!(
                "{} should hold a data structure, found {}",
                field.container_name,
                other.describe()
            ))),
        }
    }

    fn set_data(
        &mut self,
        data: &Arc<DataDefinition>,
        value: Value,
    ) -> Result<Option<Value>, EvalError> {
        let index = data.key.index();
        if self.values.len() <= index {
            self.values.resize_with(index + 1, || None);
        }
        let slot = &mut self.values[index];
        if let Some(existing) = slot {
            if !existing.definition.name().eq_ignore_ascii_case(&data.name) {
                return Err(key_collision(
                    data.key.raw(),
                    existing.definition.name(),
                    &data.name,
                ));
            }
            if let (Value::DataStruct(current), Value::DataStruct(incoming)) =
                (&existing.value, &value)
            {
                let previous = current.detached();
                current.assign(incoming);
                existing.definition = AbstractDataDefinition::Data(Arc::clone(data));
                return Ok(Some(Value::DataStruct(previous)));
            }
        }
        let binding = Binding {
            definition: AbstractDataDefinition::Data(Arc::clone(data)),
            value: value.detached(),
        };
        let previous = slot.replace(binding).map(|old| old.value);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    fn set_field(&self, field: &FieldDefinition, value: &Value) -> Result<Value, EvalError> {
        let binding = self
            .binding(field.container)
            .ok_or_else(|| not_found(&field.container_name))?;
        let Value::DataStruct(ds) = &binding.value else {
            return Err(EvalError::new(format!(
                "{} should hold a data structure, found {}",
                field.container_name,
                binding.value.describe()
            )));
        };
        let view = ds.view(field.start, &field.ty)?;
        let previous = view.read().detached();
        view.write(value)?;
        Ok(previous)
    }
}
