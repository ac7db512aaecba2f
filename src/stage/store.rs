//! In-memory stage: a layer stack with an edit target.

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::core::{
    ComposedPrim, EditTarget, SceneReader, SceneStore, Specifier,
};
use crate::util::{Error, NodePath, PropertyPath, Result, Value, ValueType};

use super::compose::Composer;
use super::layer::{AttributeSpec, Layer, PrimSpec};

/// Identifier of the layer every stage starts with.
pub const ROOT_LAYER_ID: &str = "anon:root";

struct StageData {
    layers: Vec<Layer>,
    edit_target: EditTarget,
}

/// A composed scene graph held in memory.
///
/// Layer 0 is the strongest. Reads compose on demand; writes go to the
/// current [`EditTarget`]. All access goes through one `RwLock`, so a
/// `Stage` can be shared between threads for concurrent reads.
pub struct Stage {
    data: RwLock<StageData>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    /// Create a stage with a single empty root layer.
    pub fn new() -> Self {
        Self::from_layers(vec![Layer::new(ROOT_LAYER_ID)])
    }

    /// Create a stage over existing layers (strongest first).
    ///
    /// An empty list gets a root layer.
    pub fn from_layers(mut layers: Vec<Layer>) -> Self {
        if layers.is_empty() {
            layers.push(Layer::new(ROOT_LAYER_ID));
        }
        Self {
            data: RwLock::new(StageData { layers, edit_target: EditTarget::new(0) }),
        }
    }

    /// Append a weaker layer and return its index.
    pub fn add_sublayer(&self, identifier: &str) -> usize {
        let mut data = self.data.write();
        data.layers.push(Layer::new(identifier));
        data.layers.len() - 1
    }

    /// Layer identifiers, strongest first.
    pub fn layer_identifiers(&self) -> Vec<String> {
        self.data.read().layers.iter().map(|l| l.identifier().to_string()).collect()
    }

    /// Index of a layer by identifier.
    pub fn layer_index(&self, identifier: &str) -> Option<usize> {
        self.data.read().layers.iter().position(|l| l.identifier() == identifier)
    }

    /// Copy of the layer stack.
    pub fn layers(&self) -> Vec<Layer> {
        self.data.read().layers.clone()
    }

    /// Spec at a spec path in a given layer, for inspection.
    pub fn spec(&self, layer: usize, path: &NodePath) -> Option<PrimSpec> {
        self.data.read().layers.get(layer)?.spec(path).cloned()
    }

    /// Run `f` on the spec for `path` at the edit target, creating it if needed.
    fn with_spec(&self, path: &NodePath, specifier: Specifier, f: impl FnOnce(&mut PrimSpec)) -> Result<()> {
        let mut data = self.data.write();
        let target = data.edit_target.clone();
        let count = data.layers.len();
        let layer = data
            .layers
            .get_mut(target.layer())
            .ok_or(Error::LayerOutOfBounds { index: target.layer(), count })?;
        let spec_path = target.map_to_spec_path(path);
        trace!("author {} in {}", spec_path, layer.identifier());
        f(layer.ensure_spec(&spec_path, specifier));
        Ok(())
    }

    /// Run `f` on the spec for `path` at the edit target only if it exists.
    fn with_existing_spec(&self, path: &NodePath, f: impl FnOnce(&mut PrimSpec)) {
        let mut data = self.data.write();
        let target = data.edit_target.clone();
        let spec_path = target.map_to_spec_path(path);
        if let Some(spec) = data.layers.get_mut(target.layer()).and_then(|l| l.spec_mut(&spec_path)) {
            f(spec);
        }
    }

    fn require_prim(&self, path: &NodePath) -> Result<ComposedPrim> {
        self.prim(path).ok_or_else(|| Error::PrimNotFound(path.to_string()))
    }

    fn require_attribute_type(&self, path: &PropertyPath) -> Result<(ValueType, bool)> {
        let prim = self.require_prim(path.prim())?;
        let attr = prim
            .attribute(path.name())
            .ok_or_else(|| Error::invalid(format!("attribute {} is not declared", path)))?;
        Ok((attr.value_type, attr.custom))
    }

    fn check_scene_path(path: &NodePath) -> Result<()> {
        if path.is_root() || path.has_variants() {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(())
    }
}

impl SceneReader for Stage {
    fn prim(&self, path: &NodePath) -> Option<ComposedPrim> {
        let data = self.data.read();
        Composer::new(&data.layers).compose(path)
    }

    fn children(&self, path: &NodePath) -> Vec<String> {
        if path.is_root() {
            let data = self.data.read();
            return Composer::new(&data.layers).root_children();
        }
        self.prim(path).map(|p| p.children).unwrap_or_default()
    }

    fn layer_count(&self) -> usize {
        self.data.read().layers.len()
    }
}

impl SceneStore for Stage {
    fn edit_target(&self) -> EditTarget {
        self.data.read().edit_target.clone()
    }

    fn set_edit_target(&self, target: EditTarget) -> Result<()> {
        let mut data = self.data.write();
        let count = data.layers.len();
        if target.layer() >= count {
            return Err(Error::LayerOutOfBounds { index: target.layer(), count });
        }
        debug!("edit target -> {}", target);
        data.edit_target = target;
        Ok(())
    }

    fn define_prim(&self, path: &NodePath, type_name: Option<&str>) -> Result<()> {
        Self::check_scene_path(path)?;
        for ancestor in path.prefixes().take(path.depth() - 1) {
            if !self.has_prim(&ancestor) {
                self.with_spec(&ancestor, Specifier::Def, |_| {})?;
            }
        }
        self.with_spec(path, Specifier::Def, |spec| {
            if let Some(t) = type_name {
                spec.type_name = Some(t.to_string());
            }
        })
    }

    fn override_prim(&self, path: &NodePath) -> Result<()> {
        Self::check_scene_path(path)?;
        self.require_prim(path)?;
        self.with_spec(path, Specifier::Over, |_| {})
    }

    fn create_attribute(&self, path: &PropertyPath, value_type: ValueType, custom: bool) -> Result<()> {
        let prim = self.require_prim(path.prim())?;
        if let Some(existing) = prim.attribute(path.name()) {
            if existing.value_type != value_type {
                return Err(Error::invalid(format!(
                    "attribute {} is declared as {}, not {}",
                    path, existing.value_type, value_type
                )));
            }
        }
        self.with_spec(path.prim(), Specifier::Over, |spec| {
            spec.attributes
                .entry(path.name().to_string())
                .or_insert_with(|| AttributeSpec::new(value_type, custom));
        })
    }

    fn set_attribute_default(&self, path: &PropertyPath, value: Value) -> Result<()> {
        let (value_type, custom) = self.require_attribute_type(path)?;
        if value.value_type() != value_type {
            return Err(Error::InvalidValue(format!(
                "{} is a {}, got {}",
                path,
                value_type,
                value.value_type()
            )));
        }
        self.with_spec(path.prim(), Specifier::Over, |spec| {
            spec.attributes
                .entry(path.name().to_string())
                .or_insert_with(|| AttributeSpec::new(value_type, custom))
                .default = Some(value);
        })
    }

    fn clear_attribute_default(&self, path: &PropertyPath) -> Result<()> {
        self.with_existing_spec(path.prim(), |spec| {
            if let Some(attr) = spec.attributes.get_mut(path.name()) {
                attr.default = None;
            }
        });
        Ok(())
    }

    fn set_connections(&self, path: &PropertyPath, sources: &[PropertyPath]) -> Result<()> {
        let (value_type, custom) = self.require_attribute_type(path)?;
        if let Some(bad) = sources.iter().find(|s| s.prim().has_variants()) {
            return Err(Error::InvalidPath(bad.to_string()));
        }
        self.with_spec(path.prim(), Specifier::Over, |spec| {
            spec.attributes
                .entry(path.name().to_string())
                .or_insert_with(|| AttributeSpec::new(value_type, custom))
                .connections = Some(sources.to_vec());
        })
    }

    fn add_connection(&self, path: &PropertyPath, source: &PropertyPath) -> Result<()> {
        let prim = self.require_prim(path.prim())?;
        let attr = prim
            .attribute(path.name())
            .ok_or_else(|| Error::invalid(format!("attribute {} is not declared", path)))?;
        if source.prim().has_variants() {
            return Err(Error::InvalidPath(source.to_string()));
        }
        let composed = attr.connections.clone();
        let (value_type, custom) = (attr.value_type, attr.custom);
        self.with_spec(path.prim(), Specifier::Over, |spec| {
            let attr = spec
                .attributes
                .entry(path.name().to_string())
                .or_insert_with(|| AttributeSpec::new(value_type, custom));
            let list = attr.connections.get_or_insert(composed);
            list.retain(|c| c != source);
            list.push(source.clone());
        })
    }

    fn clear_connections(&self, path: &PropertyPath) -> Result<()> {
        self.with_existing_spec(path.prim(), |spec| {
            if let Some(attr) = spec.attributes.get_mut(path.name()) {
                attr.connections = None;
            }
        });
        Ok(())
    }

    fn add_reference(&self, prim: &NodePath, target: &NodePath) -> Result<()> {
        Self::check_scene_path(target)?;
        self.require_prim(prim)?;
        self.with_spec(prim, Specifier::Over, |spec| {
            if !spec.references.contains(target) {
                spec.references.push(target.clone());
            }
        })
    }

    fn set_specializes(&self, prim: &NodePath, targets: &[NodePath]) -> Result<()> {
        for t in targets {
            Self::check_scene_path(t)?;
        }
        self.require_prim(prim)?;
        self.with_spec(prim, Specifier::Over, |spec| {
            spec.specializes = Some(targets.to_vec());
        })
    }

    fn clear_specializes(&self, prim: &NodePath) -> Result<()> {
        self.with_existing_spec(prim, |spec| spec.specializes = None);
        Ok(())
    }

    fn add_variant_set(&self, prim: &NodePath, set: &str) -> Result<()> {
        // Reuse prim-name rules for set names
        NodePath::root().child(set)?;
        self.require_prim(prim)?;
        self.with_spec(prim, Specifier::Over, |spec| {
            spec.variant_set_mut(set);
        })
    }

    fn add_variant(&self, prim: &NodePath, set: &str, variant: &str) -> Result<()> {
        NodePath::root().child(set)?;
        NodePath::root().child(variant)?;
        self.require_prim(prim)?;
        self.with_spec(prim, Specifier::Over, |spec| {
            let vs = spec.variant_set_mut(set);
            if !vs.variants.iter().any(|v| v == variant) {
                vs.variants.push(variant.to_string());
            }
        })
    }

    fn set_variant_selection(&self, prim: &NodePath, set: &str, variant: Option<&str>) -> Result<()> {
        let Some(variant) = variant else {
            self.with_existing_spec(prim, |spec| {
                spec.variant_selection.remove(set);
            });
            return Ok(());
        };

        let composed = self.require_prim(prim)?;
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
        self.with_spec(prim, Specifier::Over, |spec| {
            spec.variant_selection.insert(set.to_string(), variant.to_string());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn pp(s: &str) -> PropertyPath {
        PropertyPath::parse(s).unwrap()
    }

    #[test]
    fn test_define_creates_ancestors() {
        let stage = Stage::new();
        stage.define_prim(&p("/Looks/Wood"), Some("Material")).unwrap();
        assert!(stage.has_prim(&p("/Looks")));
        assert!(stage.prim(&p("/Looks/Wood")).unwrap().is_a("Material"));
        assert_eq!(stage.children(&NodePath::root()), ["Looks"]);
        assert_eq!(stage.traverse(), [p("/Looks"), p("/Looks/Wood")]);
    }

    #[test]
    fn test_attribute_authoring_checks() {
        let stage = Stage::new();
        let attr = pp("/M.inputs:roughness");
        assert!(matches!(stage.create_attribute(&attr, ValueType::Float, true), Err(Error::PrimNotFound(_))));

        stage.define_prim(&p("/M"), Some("Material")).unwrap();
        assert!(stage.set_attribute_default(&attr, Value::Float(0.5)).is_err());
        stage.create_attribute(&attr, ValueType::Float, true).unwrap();
        assert!(stage.create_attribute(&attr, ValueType::Int, true).unwrap_err().is_invalid_argument());
        assert!(matches!(
            stage.set_attribute_default(&attr, Value::Int(1)),
            Err(Error::InvalidValue(_))
        ));
        stage.set_attribute_default(&attr, Value::Float(0.5)).unwrap();
        assert_eq!(stage.attribute(&attr).unwrap().default, Some(Value::Float(0.5)));
        stage.clear_attribute_default(&attr).unwrap();
        assert!(!stage.attribute(&attr).unwrap().has_authored_value());
    }

    #[test]
    fn test_connections_append_and_block() {
        let stage = Stage::new();
        stage.define_prim(&p("/M"), Some("Material")).unwrap();
        let out = pp("/M.outputs:surface");
        stage.create_attribute(&out, ValueType::Token, false).unwrap();
        stage.add_connection(&out, &pp("/M/A.outputs:out")).unwrap();
        stage.add_connection(&out, &pp("/M/B.outputs:out")).unwrap();
        stage.add_connection(&out, &pp("/M/A.outputs:out")).unwrap();
        assert_eq!(
            stage.attribute(&out).unwrap().connections,
            [pp("/M/B.outputs:out"), pp("/M/A.outputs:out")]
        );

        stage.set_connections(&out, &[]).unwrap();
        assert!(!stage.attribute(&out).unwrap().is_connected());
        stage.clear_connections(&out).unwrap();
        assert!(!stage.attribute(&out).unwrap().is_connected());
    }

    #[test]
    fn test_edit_target_layers() {
        let stage = Stage::new();
        let weak = stage.add_sublayer("weak");
        assert_eq!(stage.layer_count(), 2);
        assert_eq!(stage.layer_index("weak"), Some(1));

        stage.set_edit_target(EditTarget::new(weak)).unwrap();
        stage.define_prim(&p("/M"), Some("Material")).unwrap();
        assert!(stage.spec(1, &p("/M")).is_some());
        assert!(stage.spec(0, &p("/M")).is_none());

        let err = stage.set_edit_target(EditTarget::new(7)).unwrap_err();
        assert!(matches!(err, Error::LayerOutOfBounds { index: 7, count: 2 }));
        assert_eq!(stage.edit_target(), EditTarget::new(weak));
    }

    #[test]
    fn test_variant_selection_must_be_declared() {
        let stage = Stage::new();
        let m = p("/M");
        stage.define_prim(&m, Some("Material")).unwrap();
        assert!(matches!(
            stage.set_variant_selection(&m, "look", Some("Wood")),
            Err(Error::UnknownVariantSet { .. })
        ));
        stage.add_variant(&m, "look", "Wood").unwrap();
        assert!(matches!(
            stage.set_variant_selection(&m, "look", Some("Glass")),
            Err(Error::UnknownVariant { .. })
        ));
        stage.set_variant_selection(&m, "look", Some("Wood")).unwrap();
        let info = stage.prim(&m).unwrap().variant_set("look").cloned().unwrap();
        assert_eq!(info.selection.as_deref(), Some("Wood"));
        stage.set_variant_selection(&m, "look", None).unwrap();
        assert!(stage.prim(&m).unwrap().variant_set("look").unwrap().selection.is_none());
    }

    #[test]
    fn test_variant_edit_target_redirects() {
        let stage = Stage::new();
        let m = p("/M");
        stage.define_prim(&m, Some("Material")).unwrap();
        stage.add_variant(&m, "look", "Wood").unwrap();
        stage.set_variant_selection(&m, "look", Some("Wood")).unwrap();

        stage.set_edit_target(EditTarget::new(0).for_variant(&m, "look", "Wood")).unwrap();
        stage.define_prim(&p("/M/Shader"), Some("Shader")).unwrap();
        stage.set_edit_target(EditTarget::new(0)).unwrap();

        assert!(stage.spec(0, &p("/M{look=Wood}Shader")).is_some());
        assert!(stage.spec(0, &p("/M/Shader")).is_none());
        assert!(stage.prim(&p("/M/Shader")).unwrap().is_a("Shader"));
    }
}
