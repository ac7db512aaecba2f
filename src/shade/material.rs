//! Material prims and their terminal outputs.

use std::fmt;

use tracing::debug;

use crate::core::{ComposedPrim, SceneStore, VariantSet, MATERIAL_TYPE};
use crate::util::{NodePath, Result, Value, ValueType};

use super::output::{self, Output};
use super::{TerminalKind, MATERIAL_VARIANT, OUTPUTS_PREFIX, UNIVERSAL_RENDER_CONTEXT};

/// A material: a container of shading networks exposing one output per
/// terminal and render context.
#[derive(Clone)]
pub struct Material<'a> {
    store: &'a dyn SceneStore,
    path: NodePath,
}

impl<'a> Material<'a> {
    /// Define a material prim at `path`.
    pub fn define(store: &'a dyn SceneStore, path: &NodePath) -> Result<Self> {
        debug!("define material {}", path);
        store.define_prim(path, Some(MATERIAL_TYPE))?;
        Ok(Self { store, path: path.clone() })
    }

    /// Wrap an existing prim; `None` unless it composes as a Material.
    pub fn get(store: &'a dyn SceneStore, path: &NodePath) -> Option<Self> {
        store
            .prim(path)
            .filter(|p| p.is_a(MATERIAL_TYPE))
            .map(|_| Self { store, path: path.clone() })
    }

    /// All materials in the store, depth-first.
    pub fn all(store: &'a dyn SceneStore) -> Vec<Self> {
        store.traverse().iter().filter_map(|p| Self::get(store, p)).collect()
    }

    #[inline]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Prim name.
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    #[inline]
    pub(crate) fn store(&self) -> &'a dyn SceneStore {
        self.store
    }

    /// Composed prim.
    pub fn prim(&self) -> Option<ComposedPrim> {
        self.store.prim(&self.path)
    }

    // ========================================================================
    // Terminal attributes (universal context)
    // ========================================================================

    /// The universal-context terminal output, if declared.
    pub fn terminal_attr(&self, kind: TerminalKind) -> Option<Output<'a>> {
        self.terminal_output(kind, UNIVERSAL_RENDER_CONTEXT)
    }

    /// Declare the universal-context terminal output.
    ///
    /// With `write_sparsely`, nothing is authored when `default` is absent or
    /// equals the schema fallback and no value is authored yet.
    pub fn create_terminal_attr(
        &self,
        kind: TerminalKind,
        default: Option<Value>,
        write_sparsely: bool,
    ) -> Result<Output<'a>> {
        let name = kind.output_name(UNIVERSAL_RENDER_CONTEXT);
        let attr = super::attribute::create_attribute(
            self.store,
            &self.path,
            MATERIAL_TYPE,
            &name,
            ValueType::Token,
            default,
            write_sparsely,
        )?;
        Ok(Output::new(self.store, attr.path().clone()))
    }

    pub fn surface_attr(&self) -> Option<Output<'a>> {
        self.terminal_attr(TerminalKind::Surface)
    }

    pub fn create_surface_attr(&self, default: Option<Value>, write_sparsely: bool) -> Result<Output<'a>> {
        self.create_terminal_attr(TerminalKind::Surface, default, write_sparsely)
    }

    pub fn displacement_attr(&self) -> Option<Output<'a>> {
        self.terminal_attr(TerminalKind::Displacement)
    }

    pub fn create_displacement_attr(&self, default: Option<Value>, write_sparsely: bool) -> Result<Output<'a>> {
        self.create_terminal_attr(TerminalKind::Displacement, default, write_sparsely)
    }

    pub fn volume_attr(&self) -> Option<Output<'a>> {
        self.terminal_attr(TerminalKind::Volume)
    }

    pub fn create_volume_attr(&self, default: Option<Value>, write_sparsely: bool) -> Result<Output<'a>> {
        self.create_terminal_attr(TerminalKind::Volume, default, write_sparsely)
    }

    // ========================================================================
    // Terminal outputs per render context
    // ========================================================================

    /// Terminal output for a render context, if declared.
    pub fn terminal_output(&self, kind: TerminalKind, render_context: &str) -> Option<Output<'a>> {
        let path = self.path.property(&kind.output_name(render_context)).ok()?;
        let out = Output::new(self.store, path);
        out.is_defined().then_some(out)
    }

    /// Terminal outputs of one kind across all render contexts.
    pub fn terminal_outputs(&self, kind: TerminalKind) -> Vec<Output<'a>> {
        self.outputs().into_iter().filter(|o| o.terminal() == Some(kind)).collect()
    }

    /// Declare the terminal output for a render context.
    pub fn create_terminal_output(&self, kind: TerminalKind, render_context: &str) -> Result<Output<'a>> {
        let name = kind.output_name(render_context);
        let base = name.strip_prefix(OUTPUTS_PREFIX).unwrap_or(&name);
        output::create_output_on(self.store, &self.path, MATERIAL_TYPE, base, ValueType::Token)
    }

    pub fn surface_output(&self, render_context: &str) -> Option<Output<'a>> {
        self.terminal_output(TerminalKind::Surface, render_context)
    }

    pub fn surface_outputs(&self) -> Vec<Output<'a>> {
        self.terminal_outputs(TerminalKind::Surface)
    }

    pub fn create_surface_output(&self, render_context: &str) -> Result<Output<'a>> {
        self.create_terminal_output(TerminalKind::Surface, render_context)
    }

    pub fn displacement_output(&self, render_context: &str) -> Option<Output<'a>> {
        self.terminal_output(TerminalKind::Displacement, render_context)
    }

    pub fn displacement_outputs(&self) -> Vec<Output<'a>> {
        self.terminal_outputs(TerminalKind::Displacement)
    }

    pub fn create_displacement_output(&self, render_context: &str) -> Result<Output<'a>> {
        self.create_terminal_output(TerminalKind::Displacement, render_context)
    }

    pub fn volume_output(&self, render_context: &str) -> Option<Output<'a>> {
        self.terminal_output(TerminalKind::Volume, render_context)
    }

    pub fn volume_outputs(&self) -> Vec<Output<'a>> {
        self.terminal_outputs(TerminalKind::Volume)
    }

    pub fn create_volume_output(&self, render_context: &str) -> Result<Output<'a>> {
        self.create_terminal_output(TerminalKind::Volume, render_context)
    }

    /// All declared outputs, terminal or not.
    pub fn outputs(&self) -> Vec<Output<'a>> {
        output::outputs_of(self.store, &self.path)
    }

    // ========================================================================
    // Variant sets
    // ========================================================================

    /// Handle to a variant set on this material.
    pub fn variant_set(&self, name: &str) -> VariantSet<'a> {
        VariantSet::new(self.store, &self.path, name)
    }

    /// The `materialVariant` set.
    pub fn material_variant(&self) -> VariantSet<'a> {
        self.variant_set(MATERIAL_VARIANT)
    }
}

impl fmt::Debug for Material<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Material({})", self.path)
    }
}

impl PartialEq for Material<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}
