//! Layers and prim specs.
//!
//! A layer is a flat map from spec path to [`PrimSpec`]. Opinions inside a
//! variant live at variant spec paths such as `/Master{look=Wood}`.

use std::collections::BTreeMap;

use crate::core::{MetaData, Specifier};
use crate::util::{NodePath, PropertyPath, Value, ValueType};

/// Attribute opinion.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeSpec {
    /// Declared type.
    pub value_type: ValueType,
    /// Authored default, if any.
    pub default: Option<Value>,
    /// Authored connection list; `Some(vec![])` blocks weaker opinions.
    pub connections: Option<Vec<PropertyPath>>,
    /// Declared outside any schema.
    pub custom: bool,
}

impl AttributeSpec {
    /// Declaration without value or connections.
    pub fn new(value_type: ValueType, custom: bool) -> Self {
        Self { value_type, default: None, connections: None, custom }
    }
}

/// Variant set declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantSetSpec {
    /// Set name.
    pub name: String,
    /// Declared variants, in order.
    pub variants: Vec<String>,
}

/// Prim opinion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimSpec {
    /// Def or over.
    pub specifier: Specifier,
    /// Schema type name.
    pub type_name: Option<String>,
    /// Metadata.
    pub metadata: MetaData,
    /// Attribute opinions by name.
    pub attributes: BTreeMap<String, AttributeSpec>,
    /// Internal references.
    pub references: Vec<NodePath>,
    /// Specializes list, `None` when not authored.
    pub specializes: Option<Vec<NodePath>>,
    /// Variant set declarations.
    pub variant_sets: Vec<VariantSetSpec>,
    /// Variant selections by set name.
    pub variant_selection: BTreeMap<String, String>,
}

impl PrimSpec {
    /// Empty spec with the given specifier.
    pub fn new(specifier: Specifier) -> Self {
        Self { specifier, ..Default::default() }
    }

    /// Find or declare a variant set.
    pub fn variant_set_mut(&mut self, name: &str) -> &mut VariantSetSpec {
        let pos = match self.variant_sets.iter().position(|s| s.name == name) {
            Some(pos) => pos,
            None => {
                self.variant_sets.push(VariantSetSpec { name: name.to_string(), variants: Vec::new() });
                self.variant_sets.len() - 1
            }
        };
        &mut self.variant_sets[pos]
    }
}

/// A single layer of opinions.
#[derive(Clone, Debug, Default)]
pub struct Layer {
    identifier: String,
    specs: BTreeMap<NodePath, PrimSpec>,
}

impl Layer {
    /// Create an empty layer.
    pub fn new(identifier: &str) -> Self {
        Self { identifier: identifier.to_string(), specs: BTreeMap::new() }
    }

    /// Layer identifier.
    #[inline]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Number of specs.
    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Spec at a spec path.
    pub fn spec(&self, path: &NodePath) -> Option<&PrimSpec> {
        self.specs.get(path)
    }

    /// Mutable spec at a spec path.
    pub fn spec_mut(&mut self, path: &NodePath) -> Option<&mut PrimSpec> {
        self.specs.get_mut(path)
    }

    /// Get or create the spec at a spec path.
    ///
    /// An existing spec keeps its specifier unless `specifier` is `Def`.
    pub fn ensure_spec(&mut self, path: &NodePath, specifier: Specifier) -> &mut PrimSpec {
        let spec = self
            .specs
            .entry(path.clone())
            .or_insert_with(|| PrimSpec::new(specifier));
        if specifier == Specifier::Def {
            spec.specifier = Specifier::Def;
        }
        spec
    }

    /// Replace a whole spec.
    pub fn insert_spec(&mut self, path: NodePath, spec: PrimSpec) {
        self.specs.insert(path, spec);
    }

    /// All specs in path order.
    pub fn specs(&self) -> impl Iterator<Item = (&NodePath, &PrimSpec)> {
        self.specs.iter()
    }

    /// Names of child prim specs directly under a spec path.
    pub fn child_names(&self, site: &NodePath) -> Vec<String> {
        self.specs
            .keys()
            .filter(|k| !k.ends_in_variant() && k.parent().as_ref() == Some(site))
            .filter_map(|k| k.name().map(str::to_string))
            .collect()
    }
}
