//! Core layer - the scene graph store seam and shared composed types.
//!
//! This module provides:
//! - [`SceneReader`] / [`SceneStore`] - Traits the shading core reads and authors through
//! - [`ComposedPrim`] / [`ComposedAttribute`] - Composed views of the graph
//! - [`EditTarget`] - Where authoring lands (layer + variant redirection)
//! - [`VariantSet`] - Variant set handle
//! - [`SchemaRegistry`] - Process-wide prim type definitions
//! - [`MetaData`] - Key-value prim metadata

mod composed;
mod edit_target;
mod metadata;
mod schema;
mod traits;
mod variant_set;

pub use composed::{ComposedAttribute, ComposedPrim, Specifier, VariantSetInfo};
pub use edit_target::{EditTarget, VariantSelection};
pub use metadata::MetaData;
pub use schema::{
    AttributeDefinition, PrimDefinition, SchemaRegistry,
    MATERIAL_TYPE, NODE_GRAPH_TYPE, SHADER_TYPE, INFO_ID, INFO_IMPLEMENTATION_SOURCE,
};
pub use traits::{SceneReader, SceneStore};
pub use variant_set::VariantSet;
