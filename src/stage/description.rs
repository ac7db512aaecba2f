//! JSON scene descriptions.
//!
//! A description lists layers strongest first. Each prim entry is one spec,
//! keyed by its spec path, so opinions inside a variant are written at paths
//! like `/Master{look=Wood}Shader`:
//!
//! ```json
//! {
//!   "layers": [{
//!     "identifier": "root",
//!     "prims": [
//!       { "path": "/Looks/Wood", "type": "Material",
//!         "attributes": [{ "name": "outputs:mtl:surface", "type": "token",
//!                          "connections": ["/Looks/Wood/woodShader.outputs:outSurface"] }] },
//!       { "path": "/Looks/Wood/woodShader", "type": "Shader",
//!         "attributes": [{ "name": "outputs:outSurface", "type": "float3" }] }
//!     ]
//!   }]
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{MetaData, Specifier};
use crate::util::{Error, NodePath, PropertyPath, Result, Value, ValueType};

use super::compose::Composer;
use super::layer::{AttributeSpec, Layer, PrimSpec, VariantSetSpec};
use super::store::Stage;

/// Whole scene: a layer stack.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescription {
    /// Layers, strongest first.
    pub layers: Vec<LayerDescription>,
}

/// One layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescription {
    /// Layer identifier.
    pub identifier: String,
    /// Prim specs.
    #[serde(default)]
    pub prims: Vec<PrimDescription>,
}

/// One prim spec.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimDescription {
    /// Spec path (may contain variant selections).
    pub path: NodePath,
    /// `def` or `over`.
    #[serde(default)]
    pub specifier: Specifier,
    /// Schema type name.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<NodePath>,
    /// Absent means not authored; an empty list is an explicit opinion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specializes: Option<Vec<NodePath>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_sets: Vec<VariantSetDescription>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variant_selection: BTreeMap<String, String>,
}

/// One attribute opinion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescription {
    /// Namespaced attribute name.
    pub name: String,
    /// Value type name, e.g. `token` or `float3`.
    #[serde(rename = "type")]
    pub value_type: String,
    /// Default value in the JSON shape of its type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Connection sources; an empty list blocks weaker opinions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<PropertyPath>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom: bool,
}

/// Variant set declaration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VariantSetDescription {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

impl SceneDescription {
    /// Parse from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn layer_from_description(desc: &LayerDescription) -> Result<Layer> {
    let mut layer = Layer::new(&desc.identifier);
    for prim in &desc.prims {
        if prim.path.is_root() {
            return Err(Error::InvalidPath(prim.path.to_string()));
        }
        layer.insert_spec(prim.path.clone(), spec_from_description(prim)?);
    }
    Ok(layer)
}

fn spec_from_description(desc: &PrimDescription) -> Result<PrimSpec> {
    let mut spec = PrimSpec::new(desc.specifier);
    spec.type_name = desc.type_name.clone();
    spec.metadata = desc.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<MetaData>();
    spec.references = desc.references.clone();
    spec.specializes = desc.specializes.clone();
    spec.variant_sets = desc
        .variant_sets
        .iter()
        .map(|vs| VariantSetSpec { name: vs.name.clone(), variants: vs.variants.clone() })
        .collect();
    spec.variant_selection = desc.variant_selection.clone();

    for attr in &desc.attributes {
        // Validates the name
        desc.path.property(&attr.name)?;
        let value_type = ValueType::from_name(&attr.value_type).ok_or_else(|| {
            Error::InvalidValue(format!("{}.{}: unknown type {}", desc.path, attr.name, attr.value_type))
        })?;
        let mut a = AttributeSpec::new(value_type, attr.custom);
        a.default = attr.default.as_ref().map(|v| Value::from_json(value_type, v)).transpose()?;
        a.connections = attr.connections.clone();
        spec.attributes.insert(attr.name.clone(), a);
    }
    Ok(spec)
}

/// Reject variant selections that name an undeclared set or variant.
fn check_selections(layers: &[Layer]) -> Result<()> {
    let composer = Composer::new(layers);
    for layer in layers {
        for (path, spec) in layer.specs() {
            if spec.variant_selection.is_empty() {
                continue;
            }
            let prim_path = path.strip_variants();
            let prim = composer.compose(&prim_path);
            for (set, variant) in &spec.variant_selection {
                let info = prim.as_ref().and_then(|p| p.variant_set(set)).ok_or_else(|| {
                    Error::UnknownVariantSet { prim: prim_path.to_string(), set: set.clone() }
                })?;
                if !info.has_variant(variant) {
                    return Err(Error::UnknownVariant {
                        prim: prim_path.to_string(),
                        set: set.clone(),
                        variant: variant.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Reject specializes arcs that lead back to their own prim or anywhere
/// above or below it, counting every target in every layer.
fn check_specializes(layers: &[Layer]) -> Result<()> {
    let mut arcs: HashMap<NodePath, Vec<NodePath>> = HashMap::new();
    for layer in layers {
        for (path, spec) in layer.specs() {
            if let Some(targets) = &spec.specializes {
                arcs.entry(path.strip_variants()).or_default().extend(targets.iter().cloned());
            }
        }
    }

    for (owner, targets) in &arcs {
        let mut seen: HashSet<&NodePath> = HashSet::new();
        let mut pending: Vec<&NodePath> = targets.iter().collect();
        while let Some(current) = pending.pop() {
            if current.has_prefix(owner) || owner.has_prefix(current) {
                return Err(Error::BaseMaterialCycle {
                    material: owner.to_string(),
                    base: current.to_string(),
                });
            }
            if seen.insert(current) {
                pending.extend(arcs.get(current).into_iter().flatten());
            }
        }
    }
    Ok(())
}

fn describe_spec(path: &NodePath, spec: &PrimSpec) -> PrimDescription {
    PrimDescription {
        path: path.clone(),
        specifier: spec.specifier,
        type_name: spec.type_name.clone(),
        metadata: spec.metadata.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        attributes: spec
            .attributes
            .iter()
            .map(|(name, a)| AttributeDescription {
                name: name.clone(),
                value_type: a.value_type.name().to_string(),
                default: a.default.as_ref().map(Value::to_json),
                connections: a.connections.clone(),
                custom: a.custom,
            })
            .collect(),
        references: spec.references.clone(),
        specializes: spec.specializes.clone(),
        variant_sets: spec
            .variant_sets
            .iter()
            .map(|vs| VariantSetDescription { name: vs.name.clone(), variants: vs.variants.clone() })
            .collect(),
        variant_selection: spec.variant_selection.clone(),
    }
}

impl Stage {
    /// Build a stage from a description.
    ///
    /// Selections must name declared variants, and specializes arcs may not
    /// cycle or point into their own namespace.
    pub fn from_description(desc: &SceneDescription) -> Result<Self> {
        let layers = desc.layers.iter().map(layer_from_description).collect::<Result<Vec<_>>>()?;
        check_specializes(&layers)?;
        check_selections(&layers)?;
        debug!("stage from description: {} layers", layers.len());
        Ok(Self::from_layers(layers))
    }

    /// Describe the whole layer stack.
    pub fn to_description(&self) -> SceneDescription {
        SceneDescription {
            layers: self
                .layers()
                .iter()
                .map(|layer| LayerDescription {
                    identifier: layer.identifier().to_string(),
                    prims: layer.specs().map(|(path, spec)| describe_spec(path, spec)).collect(),
                })
                .collect(),
        }
    }

    /// Load a JSON scene file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("loading {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_description(&SceneDescription::from_json(&text)?)
    }

    /// Write the layer stack as a JSON scene file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("saving {}", path.display());
        fs::write(path, self.to_description().to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneReader;

    const WOOD: &str = r#"{
        "layers": [{
            "identifier": "root",
            "prims": [
                { "path": "/Looks", "metadata": { "kind": "group" } },
                { "path": "/Looks/Wood", "type": "Material",
                  "attributes": [{ "name": "outputs:mtl:surface", "type": "token",
                                   "connections": ["/Looks/Wood/woodShader.outputs:outSurface"] }] },
                { "path": "/Looks/Wood/woodShader", "type": "Shader",
                  "attributes": [
                      { "name": "info:id", "type": "token", "default": "WoodPattern" },
                      { "name": "outputs:outSurface", "type": "float3" }
                  ] }
            ]
        }]
    }"#;

    #[test]
    fn test_load_description() {
        let stage = Stage::from_description(&SceneDescription::from_json(WOOD).unwrap()).unwrap();
        let wood = stage.prim(&NodePath::parse("/Looks/Wood").unwrap()).unwrap();
        assert!(wood.is_a("Material"));
        assert_eq!(
            wood.attribute("outputs:mtl:surface").unwrap().connections,
            [PropertyPath::parse("/Looks/Wood/woodShader.outputs:outSurface").unwrap()]
        );
        let looks = stage.prim(&NodePath::parse("/Looks").unwrap()).unwrap();
        assert_eq!(looks.metadata.kind(), Some("group"));
        let id = stage.attribute(&PropertyPath::parse("/Looks/Wood/woodShader.info:id").unwrap()).unwrap();
        assert_eq!(id.default, Some(Value::token("WoodPattern")));
    }

    #[test]
    fn test_description_round_trip() {
        let stage = Stage::from_description(&SceneDescription::from_json(WOOD).unwrap()).unwrap();
        let text = stage.to_description().to_json().unwrap();
        let again = Stage::from_description(&SceneDescription::from_json(&text).unwrap()).unwrap();
        assert_eq!(stage.layers()[0].len(), again.layers()[0].len());
        assert_eq!(stage.traverse(), again.traverse());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_type = r#"{"layers":[{"identifier":"r","prims":[
            {"path":"/M","attributes":[{"name":"a","type":"double"}]}]}]}"#;
        let err = Stage::from_description(&SceneDescription::from_json(bad_type).unwrap());
        assert!(matches!(err, Err(Error::InvalidValue(_))));

        let bad_default = r#"{"layers":[{"identifier":"r","prims":[
            {"path":"/M","attributes":[{"name":"a","type":"float3","default":1.0}]}]}]}"#;
        let err = Stage::from_description(&SceneDescription::from_json(bad_default).unwrap());
        assert!(matches!(err, Err(Error::InvalidValue(_))));

        assert!(SceneDescription::from_json(r#"{"layers":[{"identifier":"r","prims":[{"path":"Looks"}]}]}"#).is_err());
    }
}
