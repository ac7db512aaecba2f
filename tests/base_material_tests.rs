//! Integration tests for base material inheritance.

use shadenet::prelude::*;

fn p(s: &str) -> NodePath {
    NodePath::parse(s).expect("valid path")
}

/// Material with a `Surf` shader wired to its `mtl` surface output.
fn looked<'a>(stage: &'a Stage, path: &str, id: &str) -> Material<'a> {
    let m = Material::define(stage, &p(path)).unwrap();
    let s = Shader::define(stage, &p(&format!("{}/Surf", path))).unwrap();
    s.create_id_attr(Some(id), false).unwrap();
    let out = s.create_output("out", ValueType::Color3f).unwrap();
    m.create_surface_output("mtl").unwrap().connect_to_source(&out).unwrap();
    m
}

#[test]
fn test_self_cycle_keeps_base_unchanged() {
    let stage = Stage::new();
    let base = looked(&stage, "/Looks/Base", "Base");
    let m = Material::define(&stage, &p("/Looks/M")).unwrap();
    m.set_base_material(&base).unwrap();
    let layer_before = stage.spec(0, m.path()).unwrap();

    let err = m.set_base_material_path(m.path()).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(m.base_material(), Some(base));
    assert_eq!(stage.spec(0, m.path()).unwrap(), layer_before);
}

#[test]
fn test_chain_inherits_through_levels() {
    let stage = Stage::new();
    let a = looked(&stage, "/Looks/A", "APattern");
    let b = Material::define(&stage, &p("/Looks/B")).unwrap();
    let c = Material::define(&stage, &p("/Looks/C")).unwrap();
    b.set_base_material(&a).unwrap();
    c.set_base_material(&b).unwrap();

    assert_eq!(c.base_material_chain(), [b.clone(), a.clone()]);

    let src = c.compute_surface_source(&["mtl"]).expect("inherited from A");
    assert_eq!(src.shader.path(), &p("/Looks/C/Surf"));
    assert_eq!(src.value_type, ValueType::Color3f);
    assert_eq!(src.shader.id().as_deref(), Some("APattern"));

    // Closing the loop anywhere in the chain is rejected
    assert!(a.set_base_material(&c).unwrap_err().is_invalid_argument());
    assert!(a.set_base_material(&b).unwrap_err().is_invalid_argument());
    assert!(!a.has_base_material());
}

#[test]
fn test_local_output_overrides_inherited() {
    let stage = Stage::new();
    let base = looked(&stage, "/Looks/Base", "Base");
    let m = Material::define(&stage, &p("/Looks/M")).unwrap();
    m.set_base_material(&base).unwrap();

    let own = Shader::define(&stage, &p("/Looks/M/Own")).unwrap();
    let out = own.create_output("rgb", ValueType::Color3f).unwrap();
    m.create_surface_output("mtl").unwrap().connect_to_source(&out).unwrap();

    let src = m.compute_surface_source(&["mtl"]).unwrap();
    assert_eq!(src.shader.name(), "Own");
    // Base is unaffected
    assert_eq!(base.compute_surface_source(&["mtl"]).unwrap().shader.name(), "Surf");
}

#[test]
fn test_clear_always_succeeds() {
    let stage = Stage::new();
    let base = looked(&stage, "/Looks/Base", "Base");
    let m = Material::define(&stage, &p("/Looks/M")).unwrap();

    m.clear_base_material().unwrap();
    assert!(stage.spec(0, m.path()).unwrap().specializes.is_none());

    m.set_base_material(&base).unwrap();
    assert!(m.compute_surface_source(&["mtl"]).is_some());
    m.clear_base_material().unwrap();
    m.clear_base_material().unwrap();
    assert!(!m.has_base_material());
    assert!(m.compute_surface_source(&["mtl"]).is_none());
}

#[test]
fn test_retarget_base() {
    let stage = Stage::new();
    let wood = looked(&stage, "/Looks/Wood", "Wood");
    let metal = looked(&stage, "/Looks/Metal", "Metal");
    let m = Material::define(&stage, &p("/Looks/M")).unwrap();

    m.set_base_material(&wood).unwrap();
    assert_eq!(m.compute_surface_source(&["mtl"]).unwrap().shader.id().as_deref(), Some("Wood"));
    m.set_base_material(&metal).unwrap();
    assert_eq!(m.base_material_path(), Some(p("/Looks/Metal")));
    assert_eq!(m.compute_surface_source(&["mtl"]).unwrap().shader.id().as_deref(), Some("Metal"));
}
