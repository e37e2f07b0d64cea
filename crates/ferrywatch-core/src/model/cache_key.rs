// ── Cache keys ──
//
// A cache key is an ordered tuple of string segments, compared
// structurally. `["Machine", "vm-1"]` names one entity, `["Machine"]`
// names the list view of a kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::resource::ResourceKind;

/// Identifies one entry (or, as a prefix, a family of entries) in the query cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// `[kind]`: the list-view key of a kind.
    pub fn list(kind: ResourceKind) -> Self {
        Self(vec![kind.to_string()])
    }

    /// `[kind, id]`: the key of a single entity.
    pub fn entity(kind: impl fmt::Display, id: impl Into<String>) -> Self {
        Self(vec![kind.to_string(), id.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` matches the leading segments of this key.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for CacheKey {
    fn from(segments: [S; N]) -> Self {
        Self::new(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        assert_eq!(CacheKey::from(["Machine", "vm-1"]), CacheKey::entity(ResourceKind::Machine, "vm-1"));
        assert_ne!(CacheKey::from(["Machine", "vm-1"]), CacheKey::from(["Machine", "vm-2"]));
    }

    #[test]
    fn prefix_matching() {
        let entity = CacheKey::from(["Node", "node-7"]);
        assert!(entity.starts_with(&CacheKey::list(ResourceKind::Node)));
        assert!(entity.starts_with(&entity));
        assert!(!CacheKey::list(ResourceKind::Node).starts_with(&entity));
        assert!(!entity.starts_with(&CacheKey::list(ResourceKind::Machine)));
    }

    #[test]
    fn displays_as_path() {
        assert_eq!(CacheKey::from(["Machine", "vm-1"]).to_string(), "Machine/vm-1");
    }

    #[test]
    fn serializes_as_array() {
        let json = serde_json::to_string(&CacheKey::from(["Node", "n1"])).unwrap_or_default();
        assert_eq!(json, r#"["Node","n1"]"#);
    }
}
