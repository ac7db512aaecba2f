//! In-memory scene graph store.
//!
//! A small layered store behind [`SceneStore`](crate::core::SceneStore):
//! - [`Stage`] - Layer stack, edit target, composed reads
//! - [`Layer`] / [`PrimSpec`] - Raw opinions keyed by spec path
//! - [`SceneDescription`] - JSON scene files
//!
//! Composition covers what shading networks need: layer strength, variant
//! selections, internal references and specializes.

mod compose;
mod description;
mod layer;
mod store;

pub use description::{
    AttributeDescription, LayerDescription, PrimDescription, SceneDescription, VariantSetDescription,
};
pub use layer::{AttributeSpec, Layer, PrimSpec, VariantSetSpec};
pub use store::{Stage, ROOT_LAYER_ID};
