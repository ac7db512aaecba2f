//! Prim composition over a layer stack.
//!
//! Opinions for a prim are gathered strongest first:
//! 1. local specs in every layer (layer 0 is strongest)
//! 2. variant specs for the selections on the prim and its ancestors
//! 3. internal references, declared on the prim or on an ancestor
//! 4. specializes, declared on the prim or on an ancestor
//!
//! Opinions reached through an arc carry a namespace mapping so that
//! connection targets inside the arc's source land in the composed prim's
//! namespace. Arc cycles are cut when a path is revisited. Arcs that target
//! a path above or below their own prim are ignored, as is anything past
//! `MAX_ARC_DEPTH` nested arcs.

use std::collections::HashSet;

use crate::core::{ComposedAttribute, ComposedPrim, Specifier, VariantSetInfo};
use crate::util::{NodePath, PropertyPath};

use super::layer::{Layer, PrimSpec};

/// Longest chain of arcs followed while composing one prim.
const MAX_ARC_DEPTH: usize = 64;

/// True if one path is an ancestor of (or equal to) the other.
fn nested(a: &NodePath, b: &NodePath) -> bool {
    a.has_prefix(b) || b.has_prefix(a)
}

/// Source-to-target namespace mapping, innermost pair first.
#[derive(Clone, Debug, Default)]
struct PathMap {
    pairs: Vec<(NodePath, NodePath)>,
}

impl PathMap {
    /// Map from `source` to `target`, then through `self`.
    fn nest(&self, source: &NodePath, target: &NodePath) -> Self {
        let mut pairs = Vec::with_capacity(self.pairs.len() + 1);
        pairs.push((source.clone(), target.clone()));
        pairs.extend(self.pairs.iter().cloned());
        Self { pairs }
    }

    fn apply(&self, path: &PropertyPath) -> PropertyPath {
        let mut prim = path.prim().clone();
        for (src, dst) in &self.pairs {
            if let Some(mapped) = prim.replace_prefix(src, dst) {
                prim = mapped;
            }
        }
        path.with_prim(prim)
    }
}

/// One spec contributing to a prim.
struct Opinion<'d> {
    layer: usize,
    site: NodePath,
    spec: &'d PrimSpec,
    map: PathMap,
}

/// Arcs declared directly at a prim (local and variant specs).
#[derive(Default)]
struct Arcs {
    references: Vec<NodePath>,
    specializes: Vec<NodePath>,
}

impl Arcs {
    fn from_opinions(opinions: &[Opinion<'_>]) -> Self {
        let mut arcs = Self::default();
        let mut specializes_done = false;
        for op in opinions {
            for r in &op.spec.references {
                if !arcs.references.contains(r) {
                    arcs.references.push(r.clone());
                }
            }
            if !specializes_done {
                if let Some(s) = &op.spec.specializes {
                    arcs.specializes = s.clone();
                    specializes_done = true;
                }
            }
        }
        arcs
    }
}

/// Composes prims from a borrowed layer stack.
pub(crate) struct Composer<'d> {
    layers: &'d [Layer],
}

impl<'d> Composer<'d> {
    pub(crate) fn new(layers: &'d [Layer]) -> Self {
        Self { layers }
    }

    /// Compose the prim at a variant-free path.
    pub(crate) fn compose(&self, path: &NodePath) -> Option<ComposedPrim> {
        if path.is_root() || path.has_variants() {
            return None;
        }
        let opinions = self.prim_index(path);
        if opinions.is_empty() {
            return None;
        }

        let mut prim = ComposedPrim { path: path.clone(), ..Default::default() };
        let mut connections_done: HashSet<&str> = HashSet::new();
        let mut specializes_done = false;

        for op in &opinions {
            let spec = op.spec;
            prim.defined |= spec.specifier == Specifier::Def;
            if prim.type_name.is_none() {
                prim.type_name = spec.type_name.clone();
            }
            prim.metadata.merge_weaker(&spec.metadata);

            for (name, attr) in &spec.attributes {
                let Ok(attr_path) = path.property(name) else { continue };
                let entry = prim.attributes.entry(name.clone()).or_insert_with(|| ComposedAttribute {
                    path: attr_path,
                    value_type: attr.value_type,
                    default: None,
                    connections: Vec::new(),
                    custom: attr.custom,
                });
                if entry.default.is_none() {
                    entry.default = attr.default.clone();
                }
                if !connections_done.contains(name.as_str()) {
                    if let Some(conns) = &attr.connections {
                        entry.connections = conns.iter().map(|c| op.map.apply(c)).collect();
                        connections_done.insert(name.as_str());
                    }
                }
            }

            for r in &spec.references {
                if !prim.references.contains(r) {
                    prim.references.push(r.clone());
                }
            }
            if !specializes_done {
                if let Some(s) = &spec.specializes {
                    prim.specializes = s.clone();
                    specializes_done = true;
                }
            }

            for vs in &spec.variant_sets {
                let pos = match prim.variant_sets.iter().position(|s| s.name == vs.name) {
                    Some(pos) => pos,
                    None => {
                        prim.variant_sets.push(VariantSetInfo { name: vs.name.clone(), ..Default::default() });
                        prim.variant_sets.len() - 1
                    }
                };
                let info = &mut prim.variant_sets[pos];
                for v in &vs.variants {
                    if !info.has_variant(v) {
                        info.variants.push(v.clone());
                    }
                }
            }

            for name in self.layers[op.layer].child_names(&op.site) {
                if !prim.children.contains(&name) {
                    prim.children.push(name);
                }
            }
        }

        for info in &mut prim.variant_sets {
            info.selection = opinions
                .iter()
                .find_map(|op| op.spec.variant_selection.get(&info.name))
                .filter(|v| info.has_variant(v))
                .cloned();
        }

        Some(prim)
    }

    /// Child names of the pseudo-root.
    pub(crate) fn root_children(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for layer in self.layers {
            for name in layer.child_names(&NodePath::root()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn prim_index(&self, path: &NodePath) -> Vec<Opinion<'d>> {
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.gather(path, &PathMap::default(), &mut visiting, &mut out);
        out
    }

    fn gather(
        &self,
        path: &NodePath,
        map: &PathMap,
        visiting: &mut Vec<NodePath>,
        out: &mut Vec<Opinion<'d>>,
    ) {
        if visiting.len() >= MAX_ARC_DEPTH || visiting.contains(path) {
            return;
        }
        visiting.push(path.clone());

        let start = out.len();
        self.site_opinions(path, map, out);
        let direct = Arcs::from_opinions(&out[start..]);

        // Arcs on ancestors, nearest first
        let ancestral: Vec<(NodePath, Arcs)> = path
            .prefixes()
            .take(path.depth().saturating_sub(1))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|a| {
                let arcs = self.direct_arcs(&a);
                (a, arcs)
            })
            .collect();

        for target in direct.references.iter().filter(|t| !nested(t, path)) {
            self.gather(target, &map.nest(target, path), visiting, out);
        }
        for (ancestor, arcs) in &ancestral {
            for target in arcs.references.iter().filter(|t| !nested(t, ancestor)) {
                if let Some(source) = path.replace_prefix(ancestor, target) {
                    self.gather(&source, &map.nest(target, ancestor), visiting, out);
                }
            }
        }
        for target in direct.specializes.iter().filter(|t| !nested(t, path)) {
            self.gather(target, &map.nest(target, path), visiting, out);
        }
        for (ancestor, arcs) in &ancestral {
            for target in arcs.specializes.iter().filter(|t| !nested(t, ancestor)) {
                if let Some(source) = path.replace_prefix(ancestor, target) {
                    self.gather(&source, &map.nest(target, ancestor), visiting, out);
                }
            }
        }

        visiting.pop();
    }

    /// Local and variant opinions at a path, without following arcs.
    fn site_opinions(&self, path: &NodePath, map: &PathMap, out: &mut Vec<Opinion<'d>>) {
        self.layer_opinions(path, map, out);
        for site in self.variant_sites(path) {
            self.layer_opinions(&site, map, out);
        }
    }

    fn layer_opinions(&self, site: &NodePath, map: &PathMap, out: &mut Vec<Opinion<'d>>) {
        for (layer, l) in self.layers.iter().enumerate() {
            if let Some(spec) = l.spec(site) {
                out.push(Opinion { layer, site: site.clone(), spec, map: map.clone() });
            }
        }
    }

    fn direct_arcs(&self, path: &NodePath) -> Arcs {
        let mut ops = Vec::new();
        self.site_opinions(path, &PathMap::default(), &mut ops);
        Arcs::from_opinions(&ops)
    }

    /// Variant spec paths selected on `path` and its ancestors.
    fn variant_sites(&self, path: &NodePath) -> Vec<NodePath> {
        let mut sites = Vec::new();
        for (depth, prefix) in path.prefixes().enumerate() {
            for (set, variant) in self.local_selections(&prefix) {
                sites.push(path.with_variant_at(depth + 1, &set, &variant));
            }
        }
        sites
    }

    /// Variant selections authored on the prim's local specs, strongest wins.
    /// Selections naming a variant no local spec declares are dropped.
    fn local_selections(&self, prim: &NodePath) -> Vec<(String, String)> {
        let mut sel: Vec<(String, String)> = Vec::new();
        for layer in self.layers {
            let Some(spec) = layer.spec(prim) else { continue };
            for (set, variant) in &spec.variant_selection {
                if !sel.iter().any(|(s, _)| s == set) {
                    sel.push((set.clone(), variant.clone()));
                }
            }
        }
        sel.retain(|(set, variant)| self.declares(prim, set, variant));
        sel
    }

    fn declares(&self, prim: &NodePath, set: &str, variant: &str) -> bool {
        self.layers.iter().filter_map(|l| l.spec(prim)).any(|spec| {
            spec.variant_sets.iter().any(|vs| vs.name == set && vs.variants.iter().any(|v| v == variant))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::layer::AttributeSpec;
    use crate::util::ValueType;

    fn p(s: &str) -> NodePath {
        NodePath::parse(s).unwrap()
    }

    fn pp(s: &str) -> PropertyPath {
        PropertyPath::parse(s).unwrap()
    }

    fn typed(layer: &mut Layer, path: &str, type_name: &str) -> NodePath {
        let path = p(path);
        layer.ensure_spec(&path, Specifier::Def).type_name = Some(type_name.into());
        path
    }

    fn connect(layer: &mut Layer, prim: &str, attr: &str, source: &str) {
        let mut spec = AttributeSpec::new(ValueType::Token, false);
        spec.connections = Some(vec![pp(source)]);
        layer.ensure_spec(&p(prim), Specifier::Over).attributes.insert(attr.into(), spec);
    }

    #[test]
    fn test_stronger_layer_wins() {
        let mut strong = Layer::new("strong");
        let mut weak = Layer::new("weak");
        typed(&mut weak, "/M", "Material");
        connect(&mut weak, "/M", "outputs:surface", "/M/A.outputs:out");
        connect(&mut strong, "/M", "outputs:surface", "/M/B.outputs:out");
        let layers = [strong, weak];

        let prim = Composer::new(&layers).compose(&p("/M")).unwrap();
        assert!(prim.is_a("Material"));
        assert!(prim.defined);
        let attr = prim.attribute("outputs:surface").unwrap();
        assert_eq!(attr.connections, [pp("/M/B.outputs:out")]);
    }

    #[test]
    fn test_reference_maps_namespace() {
        let mut layer = Layer::new("root");
        typed(&mut layer, "/Looks/A", "Material");
        typed(&mut layer, "/Looks/A/Shader", "Shader");
        connect(&mut layer, "/Looks/A", "outputs:surface", "/Looks/A/Shader.outputs:out");
        layer.ensure_spec(&p("/Master"), Specifier::Def).references.push(p("/Looks/A"));
        let layers = [layer];
        let composer = Composer::new(&layers);

        let master = composer.compose(&p("/Master")).unwrap();
        assert!(master.is_a("Material"));
        assert_eq!(master.children, ["Shader"]);
        assert_eq!(
            master.attribute("outputs:surface").unwrap().connections,
            [pp("/Master/Shader.outputs:out")]
        );
        let shader = composer.compose(&p("/Master/Shader")).unwrap();
        assert!(shader.is_a("Shader"));
    }

    #[test]
    fn test_variant_opinions_follow_selection() {
        let mut layer = Layer::new("root");
        let m = typed(&mut layer, "/M", "Material");
        {
            let spec = layer.spec_mut(&m).unwrap();
            let set = spec.variant_set_mut("look");
            set.variants = vec!["X".into(), "Y".into()];
        }
        connect(&mut layer, "/M{look=X}", "outputs:surface", "/M/X.outputs:out");
        connect(&mut layer, "/M{look=Y}", "outputs:surface", "/M/Y.outputs:out");
        layer.ensure_spec(&p("/M{look=Y}Inner"), Specifier::Def);

        let layers = [layer.clone()];
        let prim = Composer::new(&layers).compose(&m).unwrap();
        assert!(prim.attribute("outputs:surface").is_none());
        assert_eq!(prim.variant_set("look").unwrap().selection, None);

        layer.spec_mut(&m).unwrap().variant_selection.insert("look".into(), "Y".into());
        let layers = [layer];
        let composer = Composer::new(&layers);
        let prim = composer.compose(&m).unwrap();
        assert_eq!(prim.variant_set("look").unwrap().selection.as_deref(), Some("Y"));
        assert_eq!(prim.attribute("outputs:surface").unwrap().connections, [pp("/M/Y.outputs:out")]);
        assert_eq!(prim.children, ["Inner"]);
        assert!(composer.compose(&p("/M/Inner")).is_some());
    }

    #[test]
    fn test_specializes_is_weakest_and_cycles_terminate() {
        let mut layer = Layer::new("root");
        typed(&mut layer, "/Base", "Material");
        connect(&mut layer, "/Base", "outputs:surface", "/Base/S.outputs:out");
        connect(&mut layer, "/Base", "outputs:volume", "/Base/V.outputs:out");
        typed(&mut layer, "/Derived", "Material");
        connect(&mut layer, "/Derived", "outputs:surface", "/Derived/S.outputs:out");
        layer.spec_mut(&p("/Derived")).unwrap().specializes = Some(vec![p("/Base")]);
        // Pre-existing cycle must not hang composition
        layer.spec_mut(&p("/Base")).unwrap().specializes = Some(vec![p("/Derived")]);

        let layers = [layer];
        let prim = Composer::new(&layers).compose(&p("/Derived")).unwrap();
        assert_eq!(prim.specializes, [p("/Base")]);
        assert_eq!(prim.attribute("outputs:surface").unwrap().connections, [pp("/Derived/S.outputs:out")]);
        assert_eq!(prim.attribute("outputs:volume").unwrap().connections, [pp("/Derived/V.outputs:out")]);
    }

    #[test]
    fn test_nested_arcs_terminate() {
        let mut layer = Layer::new("root");
        typed(&mut layer, "/M", "Material");
        typed(&mut layer, "/M/Child", "Material");
        connect(&mut layer, "/M/Child", "outputs:surface", "/M/Child/S.outputs:out");
        layer.spec_mut(&p("/M")).unwrap().specializes = Some(vec![p("/M/Child")]);
        layer.spec_mut(&p("/M")).unwrap().references.push(p("/M/Child"));
        typed(&mut layer, "/Master", "Material");
        typed(&mut layer, "/Master/Looks/A", "Material");
        layer.spec_mut(&p("/Master")).unwrap().references.push(p("/Master/Looks/A"));

        let layers = [layer];
        let composer = Composer::new(&layers);
        let m = composer.compose(&p("/M")).unwrap();
        assert_eq!(m.specializes, [p("/M/Child")]);
        assert!(m.attribute("outputs:surface").is_none());
        let child = composer.compose(&p("/M/Child")).unwrap();
        assert!(child.attribute("outputs:surface").is_some());
        assert!(composer.compose(&p("/M/Child/Child")).is_none());
        assert!(composer.compose(&p("/Master/Looks/A")).is_some());
    }

    #[test]
    fn test_mutually_nested_arcs_terminate() {
        // /A/X reaches /B/X, which reaches /A/X/X, and so on
        let mut layer = Layer::new("root");
        typed(&mut layer, "/A", "Material");
        typed(&mut layer, "/B", "Material");
        typed(&mut layer, "/A/X", "Material");
        layer.spec_mut(&p("/A")).unwrap().specializes = Some(vec![p("/B")]);
        layer.spec_mut(&p("/B")).unwrap().specializes = Some(vec![p("/A/X")]);

        let layers = [layer];
        let composer = Composer::new(&layers);
        assert!(composer.compose(&p("/A")).is_some());
        assert!(composer.compose(&p("/A/X")).is_some());
        assert!(composer.compose(&p("/B")).is_some());
    }

    #[test]
    fn test_undeclared_selection_ignored() {
        let mut layer = Layer::new("root");
        let m = typed(&mut layer, "/M", "Material");
        {
            let spec = layer.spec_mut(&m).unwrap();
            spec.variant_set_mut("look").variants = vec!["X".into()];
            spec.variant_selection.insert("look".into(), "Nope".into());
        }
        connect(&mut layer, "/M{look=Nope}", "outputs:surface", "/M/N.outputs:out");

        let layers = [layer];
        let prim = Composer::new(&layers).compose(&m).unwrap();
        assert_eq!(prim.variant_set("look").unwrap().selection, None);
        assert!(prim.attribute("outputs:surface").is_none());
    }

    #[test]
    fn test_missing_prim() {
        let layers = [Layer::new("root")];
        let composer = Composer::new(&layers);
        assert!(composer.compose(&p("/Nope")).is_none());
        assert!(composer.compose(&NodePath::root()).is_none());
        assert!(composer.root_children().is_empty());
    }
}
