//! Prim metadata.
//!
//! Metadata is stored as key-value pairs of strings and carries
//! non-shading information such as the model kind or documentation.

use smallvec::SmallVec;
use std::fmt;

/// Metadata storage - key-value pairs of strings.
///
/// Uses SmallVec optimization for common case of few entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: SmallVec<[(String, String); 4]>,
}

impl MetaData {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metadata value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        // Update existing or add new
        for (k, v) in &mut self.entries {
            if k == &key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Remove a key and return its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fill in keys from a weaker opinion without overriding existing ones.
    pub fn merge_weaker(&mut self, weaker: &MetaData) {
        for (k, v) in weaker.iter() {
            if !self.contains(k) {
                self.entries.push((k.to_string(), v.to_string()));
            }
        }
    }

    // === Common metadata keys ===

    /// Model kind key (e.g., "component", "assembly").
    pub const KIND_KEY: &'static str = "kind";

    /// Documentation string key.
    pub const DOC_KEY: &'static str = "documentation";

    /// Get model kind.
    pub fn kind(&self) -> Option<&str> {
        self.get(Self::KIND_KEY)
    }

    /// Get documentation.
    pub fn documentation(&self) -> Option<&str> {
        self.get(Self::DOC_KEY)
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetaData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Self::new();
        for (k, v) in iter {
            meta.set(k, v);
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_basic() {
        let mut md = MetaData::new();
        assert!(md.is_empty());

        md.set(MetaData::KIND_KEY, "component");
        md.set("foo", "bar");
        assert_eq!(md.len(), 2);
        assert_eq!(md.kind(), Some("component"));

        md.set("foo", "baz");
        assert_eq!(md.get("foo"), Some("baz"));
        assert_eq!(md.len(), 2);

        assert_eq!(md.remove("foo"), Some("baz".to_string()));
        assert!(!md.contains("foo"));
        assert_eq!(md.remove("foo"), None);
    }

    #[test]
    fn test_merge_weaker() {
        let mut strong: MetaData = [("kind", "component")].into_iter().collect();
        let weak: MetaData = [("kind", "assembly"), ("documentation", "wood")].into_iter().collect();
        strong.merge_weaker(&weak);
        assert_eq!(strong.kind(), Some("component"));
        assert_eq!(strong.documentation(), Some("wood"));
        assert_eq!(strong.to_string(), "kind=component;documentation=wood");
    }
}
