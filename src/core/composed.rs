//! Composed (read-side) views of the scene graph.
//!
//! These are what a [`SceneStore`](super::SceneStore) presents after
//! layer stacking, variant selection, references and specializes have been
//! applied. The shading core only ever reads these.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::{NodePath, PropertyPath, Value, ValueType};
use super::MetaData;

/// Whether a prim spec defines the prim or only overrides it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specifier {
    /// Concrete definition.
    #[default]
    Def,
    /// Override of opinions defined elsewhere.
    Over,
}

/// A composed attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedAttribute {
    /// Attribute path on the composed prim.
    pub path: PropertyPath,
    /// Declared value type (strongest opinion).
    pub value_type: ValueType,
    /// Default value (strongest authored opinion).
    pub default: Option<Value>,
    /// Connection sources in authoring order, mapped into this prim's namespace.
    pub connections: Vec<PropertyPath>,
    /// Declared outside any schema.
    pub custom: bool,
}

impl ComposedAttribute {
    /// Attribute name.
    #[inline]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Check if a default value is authored anywhere in the stack.
    #[inline]
    pub fn has_authored_value(&self) -> bool {
        self.default.is_some()
    }

    /// Check if any connection is authored.
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// The most recently authored connection.
    #[inline]
    pub fn last_connection(&self) -> Option<&PropertyPath> {
        self.connections.last()
    }
}

/// A composed variant set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VariantSetInfo {
    /// Variant set name.
    pub name: String,
    /// Variant names in declaration order.
    pub variants: Vec<String>,
    /// Active selection, if any.
    pub selection: Option<String>,
}

impl VariantSetInfo {
    /// Check if a variant is declared.
    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|v| v == name)
    }
}

/// A composed prim.
#[derive(Clone, Debug, Default)]
pub struct ComposedPrim {
    /// Prim path.
    pub path: NodePath,
    /// True if any opinion is a `def`.
    pub defined: bool,
    /// Schema type name (e.g., "Material", "Shader").
    pub type_name: Option<String>,
    /// Merged metadata, strongest first.
    pub metadata: MetaData,
    /// Attributes by name.
    pub attributes: BTreeMap<String, ComposedAttribute>,
    /// Internal references, strongest first.
    pub references: Vec<NodePath>,
    /// Specializes targets from the strongest authored list.
    pub specializes: Vec<NodePath>,
    /// Variant sets in declaration order.
    pub variant_sets: Vec<VariantSetInfo>,
    /// Child prim names.
    pub children: Vec<String>,
}

impl ComposedPrim {
    /// Prim name.
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    /// Check the schema type.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name.as_deref() == Some(type_name)
    }

    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&ComposedAttribute> {
        self.attributes.get(name)
    }

    /// Get a variant set by name.
    pub fn variant_set(&self, name: &str) -> Option<&VariantSetInfo> {
        self.variant_sets.iter().find(|s| s.name == name)
    }

    /// Attributes whose name starts with `prefix`.
    pub fn attributes_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a ComposedAttribute> + 'a {
        self.attributes
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(_, a)| a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(prim: &NodePath, name: &str) -> ComposedAttribute {
        ComposedAttribute {
            path: prim.property(name).unwrap(),
            value_type: ValueType::Token,
            default: None,
            connections: Vec::new(),
            custom: false,
        }
    }

    #[test]
    fn test_attributes_with_prefix() {
        let path = NodePath::parse("/Looks/Wood").unwrap();
        let mut prim = ComposedPrim { path: path.clone(), ..Default::default() };
        for name in ["info:id", "outputs:mtl:surface", "outputs:surface", "primvars:st"] {
            prim.attributes.insert(name.to_string(), attr(&path, name));
        }
        let names: Vec<&str> = prim.attributes_with_prefix("outputs:").map(|a| a.name()).collect();
        assert_eq!(names, ["outputs:mtl:surface", "outputs:surface"]);
        assert_eq!(prim.name(), "Wood");
    }

    #[test]
    fn test_last_connection_wins() {
        let path = NodePath::parse("/M").unwrap();
        let mut a = attr(&path, "outputs:surface");
        assert!(!a.is_connected());
        a.connections.push(PropertyPath::parse("/M/A.outputs:out").unwrap());
        a.connections.push(PropertyPath::parse("/M/B.outputs:out").unwrap());
        assert_eq!(a.last_connection().unwrap().to_string(), "/M/B.outputs:out");
    }
}
