//! Edit targets - where authoring operations land.

use std::fmt;

use crate::util::NodePath;

/// A variant sub-tree that authoring is redirected into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariantSelection {
    /// Prim owning the variant set.
    pub prim: NodePath,
    /// Variant set name.
    pub set: String,
    /// Variant name.
    pub variant: String,
}

/// Layer plus optional variant redirections.
///
/// Authoring on a prim at or below a redirected prim is written into the
/// variant's sub-tree: with a selection `{look=Wood}` on `/Master`, an
/// opinion on `/Master/Shader` is stored at `/Master{look=Wood}Shader`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct EditTarget {
    layer: usize,
    variants: Vec<VariantSelection>,
}

impl EditTarget {
    /// Target a layer of the stack directly.
    pub fn new(layer: usize) -> Self {
        Self { layer, variants: Vec::new() }
    }

    /// Layer index within the stack (0 is strongest).
    #[inline]
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Active variant redirections, outermost first.
    #[inline]
    pub fn variants(&self) -> &[VariantSelection] {
        &self.variants
    }

    /// Returns true if authoring is redirected into any variant.
    #[inline]
    pub fn is_variant_target(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Same redirections on another layer.
    pub fn with_layer(&self, layer: usize) -> Self {
        Self { layer, variants: self.variants.clone() }
    }

    /// Add a redirection into `prim{set=variant}`.
    pub fn for_variant(&self, prim: &NodePath, set: &str, variant: &str) -> Self {
        let mut out = self.clone();
        out.variants.push(VariantSelection {
            prim: prim.strip_variants(),
            set: set.to_string(),
            variant: variant.to_string(),
        });
        out
    }

    /// Map a scene path to the spec path opinions are authored at.
    pub fn map_to_spec_path(&self, path: &NodePath) -> NodePath {
        let mut out = path.clone();
        let plain = path.strip_variants();
        for sel in &self.variants {
            if plain.has_prefix(&sel.prim) {
                out = out.with_variant_at(sel.prim.depth(), &sel.set, &sel.variant);
            }
        }
        out
    }
}

impl fmt::Display for EditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {}", self.layer)?;
        for sel in &self.variants {
            write!(f, " {}{{{}={}}}", sel.prim, sel.set, sel.variant)?;
        }
        Ok(())
    }
}
