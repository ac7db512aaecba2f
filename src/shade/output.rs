//! Output handles and connection authoring.

use std::fmt;

use tracing::debug;

use crate::core::SceneStore;
use crate::util::{Error, NodePath, PropertyPath, Result, ValueType};

use super::attribute::{self, Attribute};
use super::{TerminalKind, OUTPUTS_PREFIX};

/// Handle to an `outputs:` attribute on a material, node graph or shader.
#[derive(Clone)]
pub struct Output<'a> {
    store: &'a dyn SceneStore,
    path: PropertyPath,
}

impl<'a> Output<'a> {
    pub(crate) fn new(store: &'a dyn SceneStore, path: PropertyPath) -> Self {
        Self { store, path }
    }

    /// Attribute path.
    #[inline]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Owning prim.
    #[inline]
    pub fn prim_path(&self) -> &NodePath {
        self.path.prim()
    }

    /// Full attribute name, e.g. `outputs:mtl:surface`.
    #[inline]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Name without the `outputs:` namespace.
    pub fn base_name(&self) -> &str {
        self.name().strip_prefix(OUTPUTS_PREFIX).unwrap_or(self.name())
    }

    /// Terminal kind, for material terminal outputs.
    pub fn terminal(&self) -> Option<TerminalKind> {
        TerminalKind::split_output_name(self.name()).map(|(k, _)| k)
    }

    /// Render context, for material terminal outputs.
    pub fn render_context(&self) -> Option<&str> {
        TerminalKind::split_output_name(self.name()).map(|(_, ctx)| ctx)
    }

    /// Declared value type.
    pub fn value_type(&self) -> Option<ValueType> {
        self.attr().value_type()
    }

    /// Check if the output is declared in the stack.
    pub fn is_defined(&self) -> bool {
        self.attr().is_defined()
    }

    /// The underlying attribute.
    pub fn attr(&self) -> Attribute<'a> {
        Attribute::new(self.store, self.path.clone())
    }

    /// Connect to `source`, replacing any connections authored at the edit target.
    pub fn connect_to_source(&self, source: &Output<'_>) -> Result<()> {
        self.connect_to_source_path(source.path())
    }

    /// Connect to a source attribute path.
    pub fn connect_to_source_path(&self, source: &PropertyPath) -> Result<()> {
        if source == &self.path {
            return Err(Error::invalid(format!("{} cannot connect to itself", self.path)));
        }
        debug!("connect {} -> {}", self.path, source);
        self.store.set_connections(&self.path, std::slice::from_ref(source))
    }

    /// Append a source, keeping existing connections.
    pub fn add_source(&self, source: &PropertyPath) -> Result<()> {
        if source == &self.path {
            return Err(Error::invalid(format!("{} cannot connect to itself", self.path)));
        }
        debug!("add source {} -> {}", self.path, source);
        self.store.add_connection(&self.path, source)
    }

    /// Composed sources in authoring order.
    pub fn connected_sources(&self) -> Vec<PropertyPath> {
        self.store.attribute(&self.path).map(|a| a.connections).unwrap_or_default()
    }

    /// The most recently authored source.
    pub fn connected_source(&self) -> Option<PropertyPath> {
        self.connected_sources().pop()
    }

    /// Check if any source is connected.
    pub fn has_connected_source(&self) -> bool {
        !self.connected_sources().is_empty()
    }

    /// Block all sources, including ones authored in weaker opinions.
    pub fn disconnect_source(&self) -> Result<()> {
        debug!("disconnect {}", self.path);
        self.store.set_connections(&self.path, &[])
    }

    /// Remove the connection opinion at the edit target.
    pub fn clear_sources(&self) -> Result<()> {
        self.store.clear_connections(&self.path)
    }
}

impl fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output({})", self.path)
    }
}

/// Declared outputs of a prim, in name order.
pub(crate) fn outputs_of<'a>(store: &'a dyn SceneStore, prim: &NodePath) -> Vec<Output<'a>> {
    let Some(composed) = store.prim(prim) else { return Vec::new() };
    composed
        .attributes_with_prefix(OUTPUTS_PREFIX)
        .map(|a| Output::new(store, a.path.clone()))
        .collect()
}

/// Declared output by base name.
pub(crate) fn output_of<'a>(store: &'a dyn SceneStore, prim: &NodePath, name: &str) -> Option<Output<'a>> {
    let path = prim.property(&format!("{}{}", OUTPUTS_PREFIX, name)).ok()?;
    let out = Output::new(store, path);
    out.is_defined().then_some(out)
}

/// Declare `outputs:<name>` on a prim of schema type `type_name`.
pub(crate) fn create_output_on<'a>(
    store: &'a dyn SceneStore,
    prim: &NodePath,
    type_name: &str,
    name: &str,
    value_type: ValueType,
) -> Result<Output<'a>> {
    let full = format!("{}{}", OUTPUTS_PREFIX, name);
    let attr = attribute::create_attribute(store, prim, type_name, &full, value_type, None, false)?;
    Ok(Output::new(store, attr.path().clone()))
}
