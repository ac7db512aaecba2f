//! Scene graph store traits.
//!
//! These traits are the seam between the shading core and whatever stores
//! and composes the scene graph. The core reads composed prims through
//! [`SceneReader`] and authors through [`SceneStore`]; it never looks at
//! layers or composition arcs directly.

use crate::util::{NodePath, PropertyPath, Result, Value, ValueType};
use super::{ComposedAttribute, ComposedPrim, EditTarget};

// ============================================================================
// Read side
// ============================================================================

/// Read access to a composed scene graph.
pub trait SceneReader: Send + Sync {
    /// Compose the prim at `path`, `None` if nothing is authored there.
    fn prim(&self, path: &NodePath) -> Option<ComposedPrim>;

    /// Child prim names of `path` (works for the root too).
    fn children(&self, path: &NodePath) -> Vec<String>;

    /// Number of layers in the stack.
    fn layer_count(&self) -> usize;

    /// Compose a single attribute.
    fn attribute(&self, path: &PropertyPath) -> Option<ComposedAttribute> {
        self.prim(path.prim())?.attributes.remove(path.name())
    }

    /// Check if a prim exists.
    fn has_prim(&self, path: &NodePath) -> bool {
        self.prim(path).is_some()
    }

    /// All prim paths, depth-first, parents before children.
    fn traverse(&self) -> Vec<NodePath> {
        let mut out = Vec::new();
        let mut stack = vec![NodePath::root()];
        while let Some(path) = stack.pop() {
            let children = self.children(&path);
            for name in children.iter().rev() {
                if let Ok(child) = path.child(name) {
                    stack.push(child);
                }
            }
            if !path.is_root() {
                out.push(path);
            }
        }
        out
    }
}

// ============================================================================
// Write side
// ============================================================================

/// Authoring access. Every write lands at the current [`EditTarget`].
///
/// Writes take `&self`; implementations guard their own data. Callers are
/// responsible for serializing writes against concurrent reads.
pub trait SceneStore: SceneReader {
    /// Current edit target.
    fn edit_target(&self) -> EditTarget;

    /// Replace the edit target.
    fn set_edit_target(&self, target: EditTarget) -> Result<()>;

    /// Define a prim (and typeless ancestors that do not exist yet).
    fn define_prim(&self, path: &NodePath, type_name: Option<&str>) -> Result<()>;

    /// Author an empty override for an existing prim.
    fn override_prim(&self, path: &NodePath) -> Result<()>;

    /// Declare an attribute on an existing prim.
    fn create_attribute(&self, path: &PropertyPath, value_type: ValueType, custom: bool) -> Result<()>;

    /// Author a default value on a declared attribute.
    fn set_attribute_default(&self, path: &PropertyPath, value: Value) -> Result<()>;

    /// Remove the default value opinion at the edit target.
    fn clear_attribute_default(&self, path: &PropertyPath) -> Result<()>;

    /// Replace the connection list. An empty list blocks weaker opinions.
    fn set_connections(&self, path: &PropertyPath, sources: &[PropertyPath]) -> Result<()>;

    /// Append a connection, keeping existing ones.
    fn add_connection(&self, path: &PropertyPath, source: &PropertyPath) -> Result<()>;

    /// Remove the connection opinion at the edit target.
    fn clear_connections(&self, path: &PropertyPath) -> Result<()>;

    /// Add an internal reference arc.
    fn add_reference(&self, prim: &NodePath, target: &NodePath) -> Result<()>;

    /// Replace the specializes list.
    fn set_specializes(&self, prim: &NodePath, targets: &[NodePath]) -> Result<()>;

    /// Remove the specializes opinion at the edit target.
    fn clear_specializes(&self, prim: &NodePath) -> Result<()>;

    /// Declare a variant set.
    fn add_variant_set(&self, prim: &NodePath, set: &str) -> Result<()>;

    /// Declare a variant (and its set if needed).
    fn add_variant(&self, prim: &NodePath, set: &str, variant: &str) -> Result<()>;

    /// Select a declared variant, or clear the selection with `None`.
    fn set_variant_selection(&self, prim: &NodePath, set: &str, variant: Option<&str>) -> Result<()>;
}
