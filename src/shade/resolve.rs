//! Context-aware terminal resolution.
//!
//! A terminal resolves by walking the requested render contexts in
//! priority order and following the first output whose connection reaches
//! a live shader output. The universal context is tried last unless the
//! caller already listed it.

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::core::{SceneStore, MATERIAL_TYPE, NODE_GRAPH_TYPE, SHADER_TYPE};
use crate::util::{NodePath, PropertyPath, ValueType};

use super::material::Material;
use super::shader::Shader;
use super::{TerminalKind, OUTPUTS_PREFIX, UNIVERSAL_RENDER_CONTEXT};

/// The shader output a terminal resolves to.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSource<'a> {
    /// Shader producing the value.
    pub shader: Shader<'a>,
    /// Output name without the `outputs:` namespace.
    pub output_name: String,
    /// Declared type of the shader output.
    pub value_type: ValueType,
}

impl ResolvedSource<'_> {
    /// Full path of the shader output.
    pub fn output_path(&self) -> Option<PropertyPath> {
        self.shader.path().property(&format!("{}{}", OUTPUTS_PREFIX, self.output_name)).ok()
    }
}

impl<'a> Material<'a> {
    /// Resolve a terminal for the given render contexts, highest priority first.
    ///
    /// Returns `None` when no context (nor the universal fallback) leads to a
    /// live shader output. Outputs whose connections dangle count as absent.
    pub fn compute_source(&self, kind: TerminalKind, contexts: &[&str]) -> Option<ResolvedSource<'a>> {
        let fallback = (!contexts.contains(&UNIVERSAL_RENDER_CONTEXT)).then_some(UNIVERSAL_RENDER_CONTEXT);

        for ctx in contexts.iter().copied().chain(fallback) {
            let Some(out) = self.terminal_output(kind, ctx) else { continue };
            if let Some(found) = follow(self.store(), out.path()) {
                trace!("{} {} resolved via context {:?}", self.path(), kind, ctx);
                return Some(found);
            }
        }
        debug!("{} {} unresolved for {:?}", self.path(), kind, contexts);
        None
    }

    pub fn compute_surface_source(&self, contexts: &[&str]) -> Option<ResolvedSource<'a>> {
        self.compute_source(TerminalKind::Surface, contexts)
    }

    pub fn compute_displacement_source(&self, contexts: &[&str]) -> Option<ResolvedSource<'a>> {
        self.compute_source(TerminalKind::Displacement, contexts)
    }

    pub fn compute_volume_source(&self, contexts: &[&str]) -> Option<ResolvedSource<'a>> {
        self.compute_source(TerminalKind::Volume, contexts)
    }
}

/// Follow the last-authored connection from `start` until a shader output.
///
/// Node graph and material outputs pass through to their own source.
fn follow<'a>(store: &'a dyn SceneStore, start: &PropertyPath) -> Option<ResolvedSource<'a>> {
    let mut visited: HashSet<PropertyPath> = HashSet::new();
    let mut current = start.clone();

    loop {
        if !visited.insert(current.clone()) {
            debug!("connection cycle at {}", current);
            return None;
        }
        let source = store.attribute(&current)?.last_connection()?.clone();
        if !source.name().starts_with(OUTPUTS_PREFIX) {
            return None;
        }
        let prim = store.prim(source.prim())?;
        let attr = prim.attribute(source.name())?;

        match prim.type_name.as_deref() {
            Some(SHADER_TYPE) => {
                let shader = Shader::get(store, source.prim())?;
                return Some(ResolvedSource {
                    shader,
                    output_name: source.name()[OUTPUTS_PREFIX.len()..].to_string(),
                    value_type: attr.value_type,
                });
            }
            Some(NODE_GRAPH_TYPE) | Some(MATERIAL_TYPE) => current = source,
            _ => return None,
        }
    }
}

/// Owned resolution result for one material.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub material: NodePath,
    pub terminal: TerminalKind,
    /// `None` when the terminal does not resolve.
    pub source: Option<SourceRef>,
}

/// Owned shader output reference.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub shader: NodePath,
    pub output: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

impl From<&ResolvedSource<'_>> for SourceRef {
    fn from(src: &ResolvedSource<'_>) -> Self {
        Self {
            shader: src.shader.path().clone(),
            output: src.output_name.clone(),
            value_type: src.value_type.name().to_string(),
        }
    }
}

/// Resolve a terminal on every material in the store, in parallel.
///
/// The store must not be authored while this runs. Results are sorted by
/// material path.
pub fn resolve_all(store: &dyn SceneStore, kind: TerminalKind, contexts: &[&str]) -> Vec<SourceInfo> {
    let materials = Material::all(store);
    debug!("resolving {} on {} materials", kind, materials.len());

    let mut out: Vec<SourceInfo> = materials
        .par_iter()
        .map(|m| SourceInfo {
            material: m.path().clone(),
            terminal: kind,
            source: m.compute_source(kind, contexts).as_ref().map(SourceRef::from),
        })
        .collect();
    out.sort_by(|a, b| a.material.cmp(&b.material));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shade::NodeGraph;
    use crate::stage::Stage;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn shader_with_output<'a>(stage: &'a Stage, path: &str, out: &str, ty: ValueType) -> Shader<'a> {
        let s = Shader::define(stage, &p(path)).unwrap();
        s.create_output(out, ty).unwrap();
        s
    }

    #[test]
    fn test_priority_order() {
        let stage = Stage::new();
        let m = Material::define(&stage, &p("/M")).unwrap();
        let a = shader_with_output(&stage, "/M/A", "out", ValueType::Float3);
        let b = shader_with_output(&stage, "/M/B", "out", ValueType::Color3f);
        m.create_surface_output("a").unwrap().connect_to_source(&a.output("out").unwrap()).unwrap();
        m.create_surface_output("b").unwrap().connect_to_source(&b.output("out").unwrap()).unwrap();

        let got = m.compute_surface_source(&["b", "a"]).unwrap();
        assert_eq!(got.shader, b);
        assert_eq!(got.value_type, ValueType::Color3f);
        assert_eq!(m.compute_surface_source(&["a", "b"]).unwrap().shader, a);
        assert_eq!(m.compute_surface_source(&["x", "b"]).unwrap().shader, b);
    }

    #[test]
    fn test_universal_fallback_and_miss() {
        let stage = Stage::new();
        let m = Material::define(&stage, &p("/M")).unwrap();
        assert!(m.compute_surface_source(&[]).is_none());

        let u = shader_with_output(&stage, "/M/U", "out", ValueType::Float3);
        m.create_surface_attr(None, false).unwrap().connect_to_source(&u.output("out").unwrap()).unwrap();
        assert_eq!(m.compute_surface_source(&["mtl"]).unwrap().shader, u);
        assert_eq!(m.compute_surface_source(&[]).unwrap().shader, u);
        assert_eq!(m.compute_surface_source(&["", "mtl"]).unwrap().shader, u);
        assert!(m.compute_displacement_source(&["mtl"]).is_none());
        assert!(m.compute_volume_source(&[]).is_none());
    }

    #[test]
    fn test_dangling_and_blocked_count_as_absent() {
        let stage = Stage::new();
        let m = Material::define(&stage, &p("/M")).unwrap();
        let u = shader_with_output(&stage, "/M/U", "out", ValueType::Float3);
        m.create_surface_attr(None, false).unwrap().connect_to_source(&u.output("out").unwrap()).unwrap();

        // Target prim missing
        let ri = m.create_surface_output("ri").unwrap();
        ri.connect_to_source_path(&PropertyPath::parse("/M/Gone.outputs:out").unwrap()).unwrap();
        assert_eq!(m.compute_surface_source(&["ri"]).unwrap().shader, u);

        // Target attribute missing
        ri.connect_to_source_path(&PropertyPath::parse("/M/U.outputs:nope").unwrap()).unwrap();
        assert_eq!(m.compute_surface_source(&["ri"]).unwrap().shader, u);

        // Blocked universal output
        m.surface_attr().unwrap().disconnect_source().unwrap();
        assert!(m.compute_surface_source(&["ri"]).is_none());
    }

    #[test]
    fn test_last_authored_connection_wins() {
        let stage = Stage::new();
        let m = Material::define(&stage, &p("/M")).unwrap();
        let a = shader_with_output(&stage, "/M/A", "out", ValueType::Float3);
        let b = shader_with_output(&stage, "/M/B", "out", ValueType::Float3);
        let out = m.create_surface_attr(None, false).unwrap();
        out.add_source(a.output("out").unwrap().path()).unwrap();
        out.add_source(b.output("out").unwrap().path()).unwrap();
        assert_eq!(out.connected_sources().len(), 2);
        assert_eq!(m.compute_surface_source(&[]).unwrap().shader, b);
    }

    #[test]
    fn test_node_graph_pass_through() {
        let stage = Stage::new();
        let m = Material::define(&stage, &p("/M")).unwrap();
        let graph = NodeGraph::define(&stage, &p("/M/Graph")).unwrap();
        let inner = shader_with_output(&stage, "/M/Graph/Inner", "rgb", ValueType::Color3f);

        let g_out = graph.create_output("surface", ValueType::Token).unwrap();
        g_out.connect_to_source(&inner.output("rgb").unwrap()).unwrap();
        m.create_surface_attr(None, false).unwrap().connect_to_source(&g_out).unwrap();

        let got = m.compute_surface_source(&[]).unwrap();
        assert_eq!(got.shader, inner);
        assert_eq!(got.output_name, "rgb");
        assert_eq!(got.output_path().unwrap().to_string(), "/M/Graph/Inner.outputs:rgb");

        // Unconnected graph output does not resolve
        g_out.disconnect_source().unwrap();
        assert!(m.compute_surface_source(&[]).is_none());
    }

    #[test]
    fn test_graph_cycle_is_a_miss() {
        let stage = Stage::new();
        let m = Material::define(&stage, &p("/M")).unwrap();
        let g1 = NodeGraph::define(&stage, &p("/M/G1")).unwrap();
        let g2 = NodeGraph::define(&stage, &p("/M/G2")).unwrap();
        let o1 = g1.create_output("out", ValueType::Token).unwrap();
        let o2 = g2.create_output("out", ValueType::Token).unwrap();
        o1.connect_to_source(&o2).unwrap();
        o2.connect_to_source(&o1).unwrap();
        m.create_surface_attr(None, false).unwrap().connect_to_source(&o1).unwrap();
        assert!(m.compute_surface_source(&[]).is_none());
    }

    #[test]
    fn test_resolve_all_sorted() {
        let stage = Stage::new();
        for name in ["B", "A"] {
            let m = Material::define(&stage, &p(&format!("/Looks/{}", name))).unwrap();
            let s = shader_with_output(&stage, &format!("/Looks/{}/S", name), "out", ValueType::Float3);
            m.create_surface_attr(None, false).unwrap().connect_to_source(&s.output("out").unwrap()).unwrap();
        }
        Material::define(&stage, &p("/Looks/Empty")).unwrap();

        let all = resolve_all(&stage, TerminalKind::Surface, &["mtl"]);
        let paths: Vec<String> = all.iter().map(|s| s.material.to_string()).collect();
        assert_eq!(paths, ["/Looks/A", "/Looks/B", "/Looks/Empty"]);
        assert_eq!(all[0].source.as_ref().unwrap().shader, p("/Looks/A/S"));
        assert_eq!(all[0].source.as_ref().unwrap().value_type, "float3");
        assert!(all[2].source.is_none());

        let json = serde_json::to_value(&all[0]).unwrap();
        assert_eq!(json["terminal"], "surface");
        assert_eq!(json["source"]["output"], "out");
    }
}
