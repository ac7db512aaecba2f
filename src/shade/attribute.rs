//! Attribute handle with schema fallbacks.

use std::fmt;

use tracing::trace;

use crate::core::{ComposedAttribute, SceneStore, SchemaRegistry};
use crate::util::{NodePath, PropertyPath, Result, Value, ValueType};

/// Handle to an attribute on a prim. The attribute need not be declared.
#[derive(Clone)]
pub struct Attribute<'a> {
    store: &'a dyn SceneStore,
    path: PropertyPath,
}

impl<'a> Attribute<'a> {
    pub(crate) fn new(store: &'a dyn SceneStore, path: PropertyPath) -> Self {
        Self { store, path }
    }

    #[inline]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Composed state, `None` if the attribute is not declared.
    pub fn composed(&self) -> Option<ComposedAttribute> {
        self.store.attribute(&self.path)
    }

    /// Check if the attribute is declared in the stack.
    pub fn is_defined(&self) -> bool {
        self.composed().is_some()
    }

    /// Declared type, falling back to the schema definition.
    pub fn value_type(&self) -> Option<ValueType> {
        if let Some(attr) = self.composed() {
            return Some(attr.value_type);
        }
        let type_name = self.store.prim(self.path.prim())?.type_name?;
        SchemaRegistry::global()
            .attribute_definition(&type_name, self.name())
            .map(|d| d.value_type)
    }

    /// Check if a value is authored anywhere in the stack.
    pub fn has_authored_value(&self) -> bool {
        self.composed().is_some_and(|a| a.has_authored_value())
    }

    /// Authored value, or the schema fallback.
    pub fn get(&self) -> Option<Value> {
        let prim = self.store.prim(self.path.prim())?;
        if let Some(v) = prim.attribute(self.name()).and_then(|a| a.default.clone()) {
            return Some(v);
        }
        schema_fallback(prim.type_name.as_deref(), self.name())
    }

    /// Author a value, declaring the attribute if needed.
    pub fn set(&self, value: Value) -> Result<()> {
        if !self.is_defined() {
            self.store.create_attribute(&self.path, value.value_type(), !self.is_schema_attribute())?;
        }
        trace!("set {} = {}", self.path, value);
        self.store.set_attribute_default(&self.path, value)
    }

    /// Remove the value opinion at the edit target.
    pub fn clear(&self) -> Result<()> {
        self.store.clear_attribute_default(&self.path)
    }

    fn is_schema_attribute(&self) -> bool {
        self.store
            .prim(self.path.prim())
            .and_then(|p| p.type_name)
            .is_some_and(|t| SchemaRegistry::global().attribute_definition(&t, self.name()).is_some())
    }
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({})", self.path)
    }
}

fn schema_fallback(type_name: Option<&str>, attr: &str) -> Option<Value> {
    SchemaRegistry::global().fallback(type_name?, attr).cloned()
}

/// Declare an attribute and optionally author its default.
///
/// With `write_sparsely`, a default equal to the schema fallback is not
/// written when no value is authored yet, and an undeclared attribute is
/// left undeclared.
pub(crate) fn create_attribute<'a>(
    store: &'a dyn SceneStore,
    prim: &NodePath,
    type_name: &str,
    name: &str,
    value_type: ValueType,
    default: Option<Value>,
    write_sparsely: bool,
) -> Result<Attribute<'a>> {
    let attr = Attribute::new(store, prim.property(name)?);
    let registry = SchemaRegistry::global();
    let custom = registry.attribute_definition(type_name, name).is_none();

    if write_sparsely && !custom {
        let fallback = registry.fallback(type_name, name);
        if default.is_none() || (!attr.has_authored_value() && default.as_ref() == fallback) {
            trace!("{} left sparse", attr.path());
            return Ok(attr);
        }
    }

    store.create_attribute(attr.path(), value_type, custom)?;
    if let Some(v) = default {
        store.set_attribute_default(attr.path(), v)?;
    }
    Ok(attr)
}
