//! Variant-scoped authoring.
//!
//! [`VariantEditScope`] redirects the store's edit target into a variant's
//! private sub-tree and restores the previous target when released or
//! dropped. [`create_master_material_variant`] builds a switch over a set of
//! materials on top of it.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::core::{EditTarget, SceneStore};
use crate::util::{Error, NodePath, Result};

use super::material::Material;
use super::MATERIAL_VARIANT;

/// Lifecycle of a [`VariantEditScope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeState {
    Active,
    Released,
}

/// Guard that redirects authoring into `prim{set=variant}`.
///
/// The previous edit target is restored exactly once: by [`release`] or, if
/// that was never called, on drop. This covers early returns, `?`
/// propagation and unwinding panics.
///
/// [`release`]: VariantEditScope::release
pub struct VariantEditScope<'a> {
    store: &'a dyn SceneStore,
    prim: NodePath,
    set: String,
    variant: String,
    target: EditTarget,
    previous: EditTarget,
    state: ScopeState,
}

impl<'a> VariantEditScope<'a> {
    /// Redirect authoring on `prim` and its descendants into a declared variant.
    ///
    /// `layer` defaults to the current edit target's layer. Nothing is
    /// redirected when this fails.
    pub fn begin(
        store: &'a dyn SceneStore,
        prim: &NodePath,
        set: &str,
        variant: &str,
        layer: Option<usize>,
    ) -> Result<Self> {
        let composed = store.prim(prim).ok_or_else(|| Error::PrimNotFound(prim.to_string()))?;
        let info = composed.variant_set(set).ok_or_else(|| Error::UnknownVariantSet {
            prim: prim.to_string(),
            set: set.to_string(),
        })?;
        if !info.has_variant(variant) {
            return Err(Error::UnknownVariant {
                prim: prim.to_string(),
                set: set.to_string(),
                variant: variant.to_string(),
            });
        }

        let previous = store.edit_target();
        let layer = layer.unwrap_or(previous.layer());
        let target = previous.with_layer(layer).for_variant(prim, set, variant);
        store.set_edit_target(target.clone())?;
        debug!("variant edit scope {}{{{}={}}} on layer {}", prim, set, variant, layer);

        Ok(Self {
            store,
            prim: prim.clone(),
            set: set.to_string(),
            variant: variant.to_string(),
            target,
            previous,
            state: ScopeState::Active,
        })
    }

    #[inline]
    pub fn state(&self) -> ScopeState {
        self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == ScopeState::Active
    }

    #[inline]
    pub fn prim_path(&self) -> &NodePath {
        &self.prim
    }

    #[inline]
    pub fn set_name(&self) -> &str {
        &self.set
    }

    #[inline]
    pub fn variant_name(&self) -> &str {
        &self.variant
    }

    /// Edit target installed by this scope.
    pub fn edit_target(&self) -> Result<&EditTarget> {
        self.ensure_active()?;
        Ok(&self.target)
    }

    /// The edited prim as a material, for authoring through the scope.
    pub fn material(&self) -> Result<Material<'a>> {
        self.ensure_active()?;
        Material::get(self.store, &self.prim)
            .ok_or_else(|| Error::invalid(format!("{} is not a material", self.prim)))
    }

    /// Run `f` against the store while the scope is active.
    pub fn edit<T>(&self, f: impl FnOnce(&'a dyn SceneStore) -> Result<T>) -> Result<T> {
        self.ensure_active()?;
        f(self.store)
    }

    /// Restore the previous edit target. Releasing twice is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if self.state == ScopeState::Released {
            return Ok(());
        }
        self.state = ScopeState::Released;
        debug!("release variant edit scope {}{{{}={}}}", self.prim, self.set, self.variant);
        self.store.set_edit_target(self.previous.clone())
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            ScopeState::Active => Ok(()),
            ScopeState::Released => Err(Error::StaleEditScope(format!(
                "{}{{{}={}}}",
                self.prim, self.set, self.variant
            ))),
        }
    }
}

impl Drop for VariantEditScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("failed to restore edit target: {}", e);
        }
    }
}

impl fmt::Debug for VariantEditScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantEditScope")
            .field("prim", &self.prim)
            .field("set", &self.set)
            .field("variant", &self.variant)
            .field("state", &self.state)
            .finish()
    }
}

impl<'a> Material<'a> {
    /// Redirect authoring into the active variant of `set`.
    ///
    /// Fails before redirecting if the set is not declared or has no
    /// selection.
    pub fn begin_variant_edit_scope(&self, set: &str, layer: Option<usize>) -> Result<VariantEditScope<'a>> {
        let info = self
            .prim()
            .and_then(|p| p.variant_set(set).cloned())
            .ok_or_else(|| Error::UnknownVariantSet { prim: self.path().to_string(), set: set.to_string() })?;
        let variant = info.selection.ok_or_else(|| {
            Error::invalid(format!("variant set {} on {} has no selection", set, self.path()))
        })?;
        VariantEditScope::begin(self.store(), self.path(), set, &variant, layer)
    }

    /// Add and select `variant` in `materialVariant`, then scope authoring into it.
    pub fn begin_material_variant_edit(&self, variant: &str, layer: Option<usize>) -> Result<VariantEditScope<'a>> {
        let set = self.material_variant();
        set.add_variant(variant)?;
        set.set_selection(variant)?;
        VariantEditScope::begin(self.store(), self.path(), set.name(), variant, layer)
    }
}

/// Create one variant per material on `master`, each referencing its material.
///
/// Variants are named after the materials' prim names and declared in input
/// order in `set` (default `materialVariant`). All inputs are validated
/// before anything is authored. The selection is left as it was.
pub fn create_master_material_variant(
    store: &dyn SceneStore,
    master: &NodePath,
    materials: &[Material<'_>],
    set: Option<&str>,
) -> Result<()> {
    let set = set.unwrap_or(MATERIAL_VARIANT);
    validate_master_inputs(store, master, materials, set)?;

    for material in materials {
        let name = material.name();
        store.add_variant(master, set, name)?;
        let mut scope = VariantEditScope::begin(store, master, set, name, None)?;
        scope.edit(|s| s.add_reference(master, material.path()))?;
        scope.release()?;
    }
    info!("created {} variants in {}{{{}}}", materials.len(), master, set);
    Ok(())
}

fn validate_master_inputs(
    store: &dyn SceneStore,
    master: &NodePath,
    materials: &[Material<'_>],
    set: &str,
) -> Result<()> {
    if materials.is_empty() {
        return Err(Error::invalid("no materials for master variant"));
    }
    // Set names follow prim name rules
    NodePath::root().child(set).map_err(|_| Error::invalid(format!("bad variant set name '{}'", set)))?;
    let composed = store
        .prim(master)
        .ok_or_else(|| Error::invalid(format!("master prim {} does not exist", master)))?;
    let existing = composed.variant_set(set);

    let mut names: HashSet<&str> = HashSet::new();
    for material in materials {
        if Material::get(store, material.path()).is_none() {
            return Err(Error::invalid(format!("{} is not a material", material.path())));
        }
        if master.has_prefix(material.path()) || material.path().has_prefix(master) {
            return Err(Error::invalid(format!("{} cannot be a variant of {}", material.path(), master)));
        }
        let name = material.name();
        if !names.insert(name) || existing.is_some_and(|s| s.has_variant(name)) {
            warn!("duplicate variant '{}' for {}", name, master);
            return Err(Error::DuplicateVariant(name.to_string()));
        }
    }
    Ok(())
}
