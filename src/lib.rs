//! # shadenet
//!
//! Shading-network resolution for material bindings.
//!
//! Given a material, shadenet resolves which shader output produces a
//! shading terminal (surface, displacement, volume) for a requested render
//! context. Resolution honors context priority with a universal fallback,
//! base-material inheritance, and variant-scoped authoring.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (paths, values, errors)
//! - [`core`] - Scene graph store traits, composed views, schema registry
//! - [`stage`] - In-memory layered scene graph store and JSON scenes
//! - [`shade`] - Materials, shaders, resolution and variant edit scopes
//!
//! ## Example
//!
//! ```ignore
//! use shadenet::prelude::*;
//!
//! let stage = Stage::load("looks.json")?;
//! let wood = Material::get(&stage, &NodePath::parse("/Looks/Wood")?).unwrap();
//!
//! if let Some(src) = wood.compute_surface_source(&["mtl"]) {
//!     println!("{} {} {}", src.shader.path(), src.output_name, src.value_type);
//! }
//! ```

pub mod util;
pub mod core;
pub mod stage;
pub mod shade;

// Re-export commonly used types
pub use util::{Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, NodePath, PropertyPath, Result, Value, ValueType};
    pub use crate::core::{
        EditTarget, SceneReader, SceneStore, MATERIAL_TYPE, NODE_GRAPH_TYPE, SHADER_TYPE,
    };
    pub use crate::stage::Stage;
    pub use crate::shade::{
        create_master_material_variant, Material, NodeGraph, Output, Shader, TerminalKind,
        VariantEditScope, MATERIAL_VARIANT, UNIVERSAL_RENDER_CONTEXT,
    };
}
