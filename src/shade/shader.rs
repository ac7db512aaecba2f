//! Shader and node graph prims.

use std::fmt;

use tracing::debug;

use crate::core::{SceneStore, INFO_ID, INFO_IMPLEMENTATION_SOURCE, NODE_GRAPH_TYPE, SHADER_TYPE};
use crate::util::{NodePath, Result, Value, ValueType};

use super::attribute::{self, Attribute};
use super::output::{self, Output};

/// A shader node: produces values on its `outputs:` attributes.
#[derive(Clone)]
pub struct Shader<'a> {
    store: &'a dyn SceneStore,
    path: NodePath,
}

impl<'a> Shader<'a> {
    /// Define a shader prim at `path`.
    pub fn define(store: &'a dyn SceneStore, path: &NodePath) -> Result<Self> {
        debug!("define shader {}", path);
        store.define_prim(path, Some(SHADER_TYPE))?;
        Ok(Self { store, path: path.clone() })
    }

    /// Wrap an existing prim; `None` unless it composes as a Shader.
    pub fn get(store: &'a dyn SceneStore, path: &NodePath) -> Option<Self> {
        store
            .prim(path)
            .filter(|p| p.is_a(SHADER_TYPE))
            .map(|_| Self { store, path: path.clone() })
    }

    #[inline]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Prim name.
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    /// Declare `outputs:<name>`.
    pub fn create_output(&self, name: &str, value_type: ValueType) -> Result<Output<'a>> {
        output::create_output_on(self.store, &self.path, SHADER_TYPE, name, value_type)
    }

    /// Declared output by base name.
    pub fn output(&self, name: &str) -> Option<Output<'a>> {
        output::output_of(self.store, &self.path, name)
    }

    /// All declared outputs.
    pub fn outputs(&self) -> Vec<Output<'a>> {
        output::outputs_of(self.store, &self.path)
    }

    /// `inputs:<name>` attribute handle.
    pub fn input(&self, name: &str) -> Result<Attribute<'a>> {
        Ok(Attribute::new(self.store, self.path.property(&format!("inputs:{}", name))?))
    }

    /// Author an input value.
    pub fn set_input(&self, name: &str, value: Value) -> Result<()> {
        self.input(name)?.set(value)
    }

    /// `info:id` attribute.
    pub fn id_attr(&self) -> Result<Attribute<'a>> {
        Ok(Attribute::new(self.store, self.path.property(INFO_ID)?))
    }

    /// Declare `info:id`.
    pub fn create_id_attr(&self, default: Option<&str>, write_sparsely: bool) -> Result<Attribute<'a>> {
        attribute::create_attribute(
            self.store,
            &self.path,
            SHADER_TYPE,
            INFO_ID,
            ValueType::Token,
            default.map(Value::token),
            write_sparsely,
        )
    }

    /// Shader identifier, if authored.
    pub fn id(&self) -> Option<String> {
        self.id_attr().ok()?.get()?.as_str().map(str::to_string)
    }

    /// `info:implementationSource` attribute.
    pub fn implementation_source_attr(&self) -> Result<Attribute<'a>> {
        Ok(Attribute::new(self.store, self.path.property(INFO_IMPLEMENTATION_SOURCE)?))
    }

    /// Declare `info:implementationSource`.
    pub fn create_implementation_source_attr(
        &self,
        default: Option<&str>,
        write_sparsely: bool,
    ) -> Result<Attribute<'a>> {
        attribute::create_attribute(
            self.store,
            &self.path,
            SHADER_TYPE,
            INFO_IMPLEMENTATION_SOURCE,
            ValueType::Token,
            default.map(Value::token),
            write_sparsely,
        )
    }

    /// How the shader is identified (`id` unless authored otherwise).
    pub fn implementation_source(&self) -> Option<String> {
        self.implementation_source_attr().ok()?.get()?.as_str().map(str::to_string)
    }
}

impl fmt::Debug for Shader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shader({})", self.path)
    }
}

impl PartialEq for Shader<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

/// A node graph: a container whose outputs forward inner shader outputs.
#[derive(Clone)]
pub struct NodeGraph<'a> {
    store: &'a dyn SceneStore,
    path: NodePath,
}

impl<'a> NodeGraph<'a> {
    /// Define a node graph prim at `path`.
    pub fn define(store: &'a dyn SceneStore, path: &NodePath) -> Result<Self> {
        debug!("define node graph {}", path);
        store.define_prim(path, Some(NODE_GRAPH_TYPE))?;
        Ok(Self { store, path: path.clone() })
    }

    /// Wrap an existing prim; `None` unless it composes as a NodeGraph.
    pub fn get(store: &'a dyn SceneStore, path: &NodePath) -> Option<Self> {
        store
            .prim(path)
            .filter(|p| p.is_a(NODE_GRAPH_TYPE))
            .map(|_| Self { store, path: path.clone() })
    }

    #[inline]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Declare `outputs:<name>`.
    pub fn create_output(&self, name: &str, value_type: ValueType) -> Result<Output<'a>> {
        output::create_output_on(self.store, &self.path, NODE_GRAPH_TYPE, name, value_type)
    }

    /// Declared output by base name.
    pub fn output(&self, name: &str) -> Option<Output<'a>> {
        output::output_of(self.store, &self.path, name)
    }

    /// All declared outputs.
    pub fn outputs(&self) -> Vec<Output<'a>> {
        output::outputs_of(self.store, &self.path)
    }
}

impl fmt::Debug for NodeGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeGraph({})", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    #[test]
    fn test_shader_outputs() {
        let stage = Stage::new();
        let shader = Shader::define(&stage, &p("/Looks/Wood/woodShader")).unwrap();
        shader.create_output("outSurface", ValueType::Float3).unwrap();
        shader.create_output("outAlpha", ValueType::Float).unwrap();

        let names: Vec<String> = shader.outputs().iter().map(|o| o.base_name().to_string()).collect();
        assert_eq!(names, ["outAlpha", "outSurface"]);
        assert_eq!(shader.output("outSurface").unwrap().value_type(), Some(ValueType::Float3));
        assert!(shader.output("missing").is_none());
        assert!(Shader::get(&stage, &p("/Looks/Wood")).is_none());
        assert_eq!(Shader::get(&stage, shader.path()).unwrap(), shader);
    }

    #[test]
    fn test_info_attributes() {
        let stage = Stage::new();
        let shader = Shader::define(&stage, &p("/S")).unwrap();
        assert_eq!(shader.id(), None);
        assert_eq!(shader.implementation_source().as_deref(), Some("id"));

        shader.create_id_attr(Some("UsdPreviewSurface"), false).unwrap();
        assert_eq!(shader.id().as_deref(), Some("UsdPreviewSurface"));

        // Fallback value is not written sparsely
        let attr = shader.create_implementation_source_attr(Some("id"), true).unwrap();
        assert!(!attr.is_defined());
        assert_eq!(attr.get(), Some(Value::token("id")));

        shader.create_implementation_source_attr(Some("sourceAsset"), true).unwrap();
        assert!(shader.implementation_source_attr().unwrap().has_authored_value());
        assert_eq!(shader.implementation_source().as_deref(), Some("sourceAsset"));
    }

    #[test]
    fn test_inputs() {
        let stage = Stage::new();
        let shader = Shader::define(&stage, &p("/S")).unwrap();
        shader.set_input("roughness", Value::Float(0.25)).unwrap();
        let input = shader.input("roughness").unwrap();
        assert!(input.composed().unwrap().custom);
        assert_eq!(input.get(), Some(Value::Float(0.25)));
        input.clear().unwrap();
        assert_eq!(input.get(), None);
    }

    #[test]
    fn test_node_graph() {
        let stage = Stage::new();
        let graph = NodeGraph::define(&stage, &p("/Looks/Graph")).unwrap();
        graph.create_output("out", ValueType::Color3f).unwrap();
        assert_eq!(graph.outputs().len(), 1);
        assert!(NodeGraph::get(&stage, graph.path()).is_some());
        assert!(Shader::get(&stage, graph.path()).is_none());
    }
}
