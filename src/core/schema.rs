//! Process-wide schema registry.
//!
//! Holds the built-in prim type definitions and their attribute fallbacks.
//! The registry is built once on first use and never mutated afterwards;
//! nothing in the shading core owns it.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::util::{Value, ValueType};

/// Material prim type name.
pub const MATERIAL_TYPE: &str = "Material";

/// Node graph prim type name.
pub const NODE_GRAPH_TYPE: &str = "NodeGraph";

/// Shader prim type name.
pub const SHADER_TYPE: &str = "Shader";

/// Shader identifier attribute.
pub const INFO_ID: &str = "info:id";

/// Shader implementation source attribute.
pub const INFO_IMPLEMENTATION_SOURCE: &str = "info:implementationSource";

/// Built-in attribute definition.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDefinition {
    /// Attribute name.
    pub name: String,
    /// Declared type.
    pub value_type: ValueType,
    /// Value reported when nothing is authored.
    pub fallback: Option<Value>,
}

impl AttributeDefinition {
    fn new(name: &str, value_type: ValueType, fallback: Option<Value>) -> Self {
        Self { name: name.to_string(), value_type, fallback }
    }
}

/// Built-in prim type definition.
#[derive(Clone, Debug, Default)]
pub struct PrimDefinition {
    /// Schema type name.
    pub type_name: String,
    /// Schema attributes.
    pub attributes: Vec<AttributeDefinition>,
}

impl PrimDefinition {
    /// Get an attribute definition by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Read-only table of prim type definitions.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    prims: HashMap<String, PrimDefinition>,
}

impl SchemaRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static SchemaRegistry {
        static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::builtin)
    }

    fn builtin() -> Self {
        let terminal = |name: &str| AttributeDefinition::new(name, ValueType::Token, None);

        let mut reg = Self::default();
        reg.insert(PrimDefinition { type_name: NODE_GRAPH_TYPE.into(), attributes: Vec::new() });
        reg.insert(PrimDefinition {
            type_name: MATERIAL_TYPE.into(),
            attributes: vec![
                terminal("outputs:surface"),
                terminal("outputs:displacement"),
                terminal("outputs:volume"),
            ],
        });
        reg.insert(PrimDefinition {
            type_name: SHADER_TYPE.into(),
            attributes: vec![
                AttributeDefinition::new(INFO_ID, ValueType::Token, None),
                AttributeDefinition::new(
                    INFO_IMPLEMENTATION_SOURCE,
                    ValueType::Token,
                    Some(Value::token("id")),
                ),
            ],
        });
        reg
    }

    fn insert(&mut self, def: PrimDefinition) {
        self.prims.insert(def.type_name.clone(), def);
    }

    /// Get a prim definition by type name.
    pub fn prim_definition(&self, type_name: &str) -> Option<&PrimDefinition> {
        self.prims.get(type_name)
    }

    /// Get an attribute definition.
    pub fn attribute_definition(&self, type_name: &str, attr: &str) -> Option<&AttributeDefinition> {
        self.prim_definition(type_name)?.attribute(attr)
    }

    /// Schema fallback for an attribute.
    pub fn fallback(&self, type_name: &str, attr: &str) -> Option<&Value> {
        self.attribute_definition(type_name, attr)?.fallback.as_ref()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prims.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let reg = SchemaRegistry::global();
        assert_eq!(reg.type_names(), [MATERIAL_TYPE, NODE_GRAPH_TYPE, SHADER_TYPE]);
        let surf = reg.attribute_definition(MATERIAL_TYPE, "outputs:surface").unwrap();
        assert_eq!(surf.value_type, ValueType::Token);
        assert!(surf.fallback.is_none());
    }

    #[test]
    fn test_fallback() {
        let reg = SchemaRegistry::global();
        assert_eq!(reg.fallback(SHADER_TYPE, INFO_IMPLEMENTATION_SOURCE), Some(&Value::token("id")));
        assert_eq!(reg.fallback(SHADER_TYPE, INFO_ID), None);
        assert_eq!(reg.fallback("Xform", "visibility"), None);
    }
}
