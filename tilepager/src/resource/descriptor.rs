use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a shared sub-resource.
///
/// Two descriptors name the same resource when `uri` and `variant` match.
/// Tags are classification hints (used to pick a LOD bin) and are ignored
/// by equality and hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    uri: String,
    variant: Option<String>,
    tags: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            variant: None,
            tags: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl PartialEq for ResourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.variant == other.variant
    }
}

impl Eq for ResourceDescriptor {}

impl Hash for ResourceDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.variant.hash(state);
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}#{}", self.uri, variant),
            None => write!(f, "{}", self.uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_identity_ignores_tags() {
        let a = ResourceDescriptor::new("oak_tree").with_tags(["tree"]);
        let b = ResourceDescriptor::new("oak_tree").with_tags(["vegetation", "tall"]);
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn test_variant_is_part_of_identity() {
        let plain = ResourceDescriptor::new("oak_tree");
        let winter = ResourceDescriptor::new("oak_tree").with_variant("winter");
        assert_ne!(plain, winter);
        assert_eq!(winter.to_string(), "oak_tree#winter");
        assert_eq!(plain.to_string(), "oak_tree");
    }

    #[test]
    fn test_has_tag() {
        let d = ResourceDescriptor::new("lamp").with_tags(["street", "light"]);
        assert!(d.has_tag("light"));
        assert!(!d.has_tag("tree"));
    }
}
