//! Variant set handle.

use crate::util::{Error, NodePath, Result};
use super::{SceneStore, VariantSetInfo};

/// Handle to a (possibly not yet declared) variant set on a prim.
#[derive(Clone)]
pub struct VariantSet<'a> {
    store: &'a dyn SceneStore,
    prim: NodePath,
    name: String,
}

impl<'a> VariantSet<'a> {
    /// Create a handle. Nothing is authored.
    pub fn new(store: &'a dyn SceneStore, prim: &NodePath, name: &str) -> Self {
        Self { store, prim: prim.clone(), name: name.to_string() }
    }

    /// Set name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning prim.
    #[inline]
    pub fn prim_path(&self) -> &NodePath {
        &self.prim
    }

    /// Composed state, `None` if the set is not declared.
    pub fn info(&self) -> Option<VariantSetInfo> {
        self.store.prim(&self.prim)?.variant_set(&self.name).cloned()
    }

    /// Check if the set is declared.
    pub fn exists(&self) -> bool {
        self.info().is_some()
    }

    /// Variant names in declaration order.
    pub fn variant_names(&self) -> Vec<String> {
        self.info().map(|i| i.variants).unwrap_or_default()
    }

    /// Check if a variant is declared.
    pub fn has_variant(&self, variant: &str) -> bool {
        self.info().is_some_and(|i| i.has_variant(variant))
    }

    /// Active selection.
    pub fn selection(&self) -> Option<String> {
        self.info()?.selection
    }

    /// Declare a variant (declaring the set if needed).
    pub fn add_variant(&self, variant: &str) -> Result<()> {
        self.store.add_variant(&self.prim, &self.name, variant)
    }

    /// Select a declared variant.
    pub fn set_selection(&self, variant: &str) -> Result<()> {
        if !self.exists() {
            return Err(Error::UnknownVariantSet { prim: self.prim.to_string(), set: self.name.clone() });
        }
        self.store.set_variant_selection(&self.prim, &self.name, Some(variant))
    }

    /// Clear the selection at the edit target.
    pub fn clear_selection(&self) -> Result<()> {
        self.store.set_variant_selection(&self.prim, &self.name, None)
    }
}

impl std::fmt::Debug for VariantSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VariantSet({}, {})", self.prim, self.name)
    }
}
