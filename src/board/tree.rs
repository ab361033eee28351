//! The element tree contract.
//!
//! The engine never owns game objects. It asks the host's tree to translate
//! between transient ids and stable paths, which is all it needs to resolve
//! client arguments and to write history that survives a rebuild.

use serde::{Deserialize, Serialize};

use crate::core::EntityId;

/// Stable location of an element: child indices from the root of the tree.
///
/// ```
/// use rust_tabletop::board::ElementPath;
///
/// let path = ElementPath::new([2, 0]);
/// assert_eq!(path.to_string(), "2/0");
/// assert_eq!("2/0".parse::<ElementPath>().unwrap(), path);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementPath(pub Vec<u32>);

impl ElementPath {
    /// Create a path from child indices.
    pub fn new(indices: impl IntoIterator<Item = u32>) -> Self {
        Self(indices.into_iter().collect())
    }

    /// Child indices from the root.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for ElementPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ElementPath {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self(Vec::new()));
        }
        s.split('/').map(str::parse).collect::<Result<Vec<_>, _>>().map(Self)
    }
}

/// Lookup services the engine needs from the host's element tree.
pub trait ElementTree {
    /// Stable path of an element, or `None` if it no longer exists.
    fn element_path(&self, id: EntityId) -> Option<ElementPath>;

    /// Element currently at `path`.
    fn element_at(&self, path: &ElementPath) -> Option<EntityId>;

    /// Check whether an element exists.
    fn contains_element(&self, id: EntityId) -> bool {
        self.element_path(id).is_some()
    }

    /// Human-readable label used when listing choices.
    fn element_label(&self, id: EntityId) -> String {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let path: ElementPath = "3/14/1".parse().unwrap();
        assert_eq!(path.indices(), &[3, 14, 1]);
        assert_eq!(path.to_string(), "3/14/1");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1/x".parse::<ElementPath>().is_err());
    }

    #[test]
    fn test_empty_path() {
        let root: ElementPath = "".parse().unwrap();
        assert_eq!(root.depth(), 0);
        assert_eq!(root.to_string(), "");
    }
}
