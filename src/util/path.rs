//! Scene paths.
//!
//! A [`NodePath`] addresses a prim in the scene namespace, e.g. `/Looks/Wood`.
//! Segments may carry variant selections, which address the private sub-tree
//! of a variant: `/Looks/Master{look=Wood}` is the Master prim inside variant
//! `Wood` of set `look`, and `/Looks/Master{look=Wood}Shader` is a child
//! authored inside that variant.
//!
//! A [`PropertyPath`] names an attribute on a prim:
//! `/Looks/Wood/Shader.outputs:surface`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use super::{Error, Result};

/// One prim name plus the variant selections applied at it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Segment {
    name: String,
    variants: SmallVec<[(String, String); 1]>,
}

impl Segment {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), variants: SmallVec::new() }
    }
}

/// Absolute path to a prim.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    segments: SmallVec<[Segment; 4]>,
}

/// Check prim name characters.
fn is_valid_prim_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check property name characters (namespaced with ':').
fn is_valid_property_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(':')
        && !name.ends_with(':')
        && !name.contains("::")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

impl NodePath {
    /// The absolute root `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path string.
    pub fn parse(s: &str) -> Result<Self> {
        let bad = || Error::InvalidPath(s.to_string());

        let mut rest = s.strip_prefix('/').ok_or_else(bad)?;
        let mut path = Self::root();
        if rest.is_empty() {
            return Ok(path);
        }

        loop {
            let end = rest.find(['/', '{']).unwrap_or(rest.len());
            let name = &rest[..end];
            if !is_valid_prim_name(name) {
                return Err(bad());
            }
            let mut seg = Segment::new(name);
            rest = &rest[end..];

            while let Some(body) = rest.strip_prefix('{') {
                let close = body.find('}').ok_or_else(bad)?;
                let (set, variant) = body[..close].split_once('=').ok_or_else(bad)?;
                if !is_valid_prim_name(set) || !is_valid_prim_name(variant) {
                    return Err(bad());
                }
                seg.variants.push((set.to_string(), variant.to_string()));
                rest = &body[close + 1..];
            }

            let had_variants = !seg.variants.is_empty();
            path.segments.push(seg);

            if rest.is_empty() {
                return Ok(path);
            }
            match rest.strip_prefix('/') {
                Some(r) if !r.is_empty() => rest = r,
                // `{set=v}Child` continues without a separator
                None if had_variants => {}
                _ => return Err(bad()),
            }
        }
    }

    /// Returns true for `/`.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of prim segments.
    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last prim name, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.name.as_str())
    }

    /// Parent path, `None` for the root.
    ///
    /// Variant selections on the remaining segments are kept, so the parent
    /// of `/M{v=a}Child` is `/M{v=a}`.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Append a child prim name.
    pub fn child(&self, name: &str) -> Result<Self> {
        if !is_valid_prim_name(name) {
            return Err(Error::InvalidPath(format!("{}/{}", self, name)));
        }
        let mut segments = self.segments.clone();
        segments.push(Segment::new(name));
        Ok(Self { segments })
    }

    /// Property path on this prim.
    pub fn property(&self, name: &str) -> Result<PropertyPath> {
        PropertyPath::new(self.clone(), name)
    }

    /// Segment-wise prefix test (variant selections must match too).
    pub fn has_prefix(&self, prefix: &NodePath) -> bool {
        prefix.depth() <= self.depth()
            && self.segments.iter().zip(prefix.segments.iter()).all(|(a, b)| a == b)
    }

    /// Returns true if any segment carries a variant selection.
    pub fn has_variants(&self) -> bool {
        self.segments.iter().any(|s| !s.variants.is_empty())
    }

    /// Returns true if the last segment carries a variant selection, i.e.
    /// the path addresses a variant rather than a child prim.
    pub fn ends_in_variant(&self) -> bool {
        self.segments.last().is_some_and(|s| !s.variants.is_empty())
    }

    /// Same path with all variant selections removed.
    pub fn strip_variants(&self) -> Self {
        Self {
            segments: self.segments.iter().map(|s| Segment::new(&s.name)).collect(),
        }
    }

    /// Truncate to the first `depth` segments.
    pub fn truncate(&self, depth: usize) -> Self {
        Self {
            segments: self.segments.iter().take(depth).cloned().collect(),
        }
    }

    /// Add a variant selection at segment `depth - 1`.
    ///
    /// `depth` counts from 1, so `with_variant_at(1, ..)` on `/A/B` yields
    /// `/A{set=v}B`.
    pub fn with_variant_at(&self, depth: usize, set: &str, variant: &str) -> Self {
        let mut out = self.clone();
        if depth > 0 {
            if let Some(seg) = out.segments.get_mut(depth - 1) {
                seg.variants.push((set.to_string(), variant.to_string()));
            }
        }
        out
    }

    /// Replace `old` prefix with `new`; `None` if `old` is not a prefix.
    pub fn replace_prefix(&self, old: &NodePath, new: &NodePath) -> Option<Self> {
        if !self.has_prefix(old) {
            return None;
        }
        let mut segments = new.segments.clone();
        segments.extend(self.segments.iter().skip(old.depth()).cloned());
        Some(Self { segments })
    }

    /// Prefixes from depth 1 up to and including this path.
    pub fn prefixes(&self) -> impl Iterator<Item = NodePath> + '_ {
        (1..=self.depth()).map(move |d| self.truncate(d))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        let mut after_variant = false;
        for seg in &self.segments {
            if !after_variant {
                f.write_str("/")?;
            }
            f.write_str(&seg.name)?;
            for (set, variant) in &seg.variants {
                write!(f, "{{{}={}}}", set, variant)?;
            }
            after_variant = !seg.variants.is_empty();
        }
        Ok(())
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({})", self)
    }
}

impl FromStr for NodePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Path to an attribute: prim path plus namespaced property name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    prim: NodePath,
    name: String,
}

impl PropertyPath {
    /// Build from a prim path and a property name.
    pub fn new(prim: NodePath, name: &str) -> Result<Self> {
        if prim.is_root() || !is_valid_property_name(name) {
            return Err(Error::InvalidPath(format!("{}.{}", prim, name)));
        }
        Ok(Self { prim, name: name.to_string() })
    }

    /// Parse `/Prim/Path.namespaced:name`.
    pub fn parse(s: &str) -> Result<Self> {
        let dot = s.rfind('.').ok_or_else(|| Error::InvalidPath(s.to_string()))?;
        let prim = NodePath::parse(&s[..dot])?;
        Self::new(prim, &s[dot + 1..])
    }

    /// Owning prim.
    #[inline]
    pub fn prim(&self) -> &NodePath {
        &self.prim
    }

    /// Property name, including namespaces.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same property name on another prim.
    pub fn with_prim(&self, prim: NodePath) -> Self {
        Self { prim, name: self.name.clone() }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.prim, self.name)
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({})", self)
    }
}

impl FromStr for PropertyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
