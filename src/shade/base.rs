//! Base material pointer.
//!
//! A material inherits unset outputs from its base material. The pointer is
//! stored as a specializes arc; the store's composition makes inherited
//! outputs visible, so nothing here walks the chain to answer queries.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::util::{Error, NodePath, Result};

use super::material::Material;

impl<'a> Material<'a> {
    /// Path of the base material, if the pointer targets a Material.
    pub fn base_material_path(&self) -> Option<NodePath> {
        let target = self.prim()?.specializes.first()?.clone();
        Material::get(self.store(), &target).map(|_| target)
    }

    /// The base material, if any.
    pub fn base_material(&self) -> Option<Material<'a>> {
        Material::get(self.store(), &self.base_material_path()?)
    }

    /// Check if a base material is set.
    pub fn has_base_material(&self) -> bool {
        self.base_material_path().is_some()
    }

    /// Point this material at `base`.
    ///
    /// Fails with [`Error::BaseMaterialCycle`] before authoring anything if
    /// `base` is this material, inherits from it, or sits above or below it
    /// in the namespace.
    pub fn set_base_material_path(&self, base: &NodePath) -> Result<()> {
        if self.would_cycle(base) {
            warn!("rejected base material {} for {}", base, self.path());
            return Err(Error::BaseMaterialCycle {
                material: self.path().to_string(),
                base: base.to_string(),
            });
        }
        info!("base material of {} -> {}", self.path(), base);
        self.store().set_specializes(self.path(), std::slice::from_ref(base))
    }

    /// Point this material at another material.
    pub fn set_base_material(&self, base: &Material<'_>) -> Result<()> {
        self.set_base_material_path(base.path())
    }

    /// Remove the base material. Succeeds when none is set.
    pub fn clear_base_material(&self) -> Result<()> {
        let inherited = self.prim().is_some_and(|p| !p.specializes.is_empty());
        if !inherited {
            return Ok(());
        }
        debug!("clear base material of {}", self.path());
        // An explicit empty list also hides opinions from weaker layers
        self.store().set_specializes(self.path(), &[])
    }

    /// Base materials, nearest first.
    pub fn base_material_chain(&self) -> Vec<Material<'a>> {
        let mut chain: Vec<Material<'a>> = Vec::new();
        let mut current = self.clone();
        while let Some(base) = current.base_material() {
            if base.path() == self.path() || chain.iter().any(|m| m.path() == base.path()) {
                break;
            }
            chain.push(base.clone());
            current = base;
        }
        chain
    }

    /// Walk every specializes target reachable from `base`, looking for this
    /// material or anything namespace-nested with it.
    fn would_cycle(&self, base: &NodePath) -> bool {
        let own = self.path();
        let mut seen: HashSet<NodePath> = HashSet::new();
        let mut pending = vec![base.clone()];
        while let Some(current) = pending.pop() {
            if current.has_prefix(own) || own.has_prefix(&current) {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(prim) = self.store().prim(&current) {
                pending.extend(prim.specializes.iter().filter(|t| !seen.contains(*t)).cloned());
            }
        }
        false
    }
}
