//! Shading networks - materials, shaders and terminal resolution.
//!
//! This module provides:
//! - [`Material`] - Terminal outputs per render context, base material pointer
//! - [`Shader`] / [`NodeGraph`] - Value-producing nodes and pass-through containers
//! - [`Output`] / [`Attribute`] - Handles for authoring values and connections
//! - [`ResolvedSource`] / [`resolve_all`] - Context-aware terminal resolution
//! - [`VariantEditScope`] - Scoped authoring into a variant
//! - [`create_master_material_variant`] - Variant switch over a set of materials
//!
//! ## Example
//!
//! ```ignore
//! use shadenet::prelude::*;
//!
//! let stage = Stage::new();
//! let wood = Material::define(&stage, &NodePath::parse("/Looks/Wood")?)?;
//! let shader = Shader::define(&stage, &NodePath::parse("/Looks/Wood/woodShader")?)?;
//! let out = shader.create_output("outSurface", ValueType::Float3)?;
//! wood.create_surface_output("mtl")?.connect_to_source(&out)?;
//!
//! let src = wood.compute_surface_source(&["mtl"]).unwrap();
//! assert_eq!(src.output_name, "outSurface");
//! ```

mod attribute;
mod base;
mod material;
mod output;
mod resolve;
mod shader;
mod terminal;
mod variant;

pub use attribute::Attribute;
pub use material::Material;
pub use output::Output;
pub use resolve::{resolve_all, ResolvedSource, SourceInfo, SourceRef};
pub use shader::{NodeGraph, Shader};
pub use terminal::TerminalKind;
pub use variant::{create_master_material_variant, ScopeState, VariantEditScope};

/// Render context used when no requested context matches.
pub const UNIVERSAL_RENDER_CONTEXT: &str = "";

/// Namespace of output attributes.
pub const OUTPUTS_PREFIX: &str = "outputs:";

/// Default variant set for material variants.
pub const MATERIAL_VARIANT: &str = "materialVariant";
