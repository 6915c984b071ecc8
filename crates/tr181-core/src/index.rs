//! Per-run path index resolving node hierarchy on demand

use crate::node::Node;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error raised when an extraction result violates path uniqueness
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("duplicate node path '{0}'")]
pub struct DuplicatePath(pub String);

/// Sorted path → node lookup for one extraction result
///
/// Hierarchy is computed from paths instead of stored as owning pointers in
/// both directions: `parent_of` walks parent prefixes, `children_of` scans the
/// contiguous key range under an object prefix.
#[derive(Debug)]
pub struct PathIndex<'a> {
    by_path: BTreeMap<&'a str, &'a Node>,
}

impl<'a> PathIndex<'a> {
    /// Build an index, enforcing path uniqueness.
    pub fn build(nodes: &'a [Node]) -> Result<Self, DuplicatePath> {
        let mut by_path = BTreeMap::new();
        for node in nodes {
            if by_path.insert(node.path.as_str(), node).is_some() {
                return Err(DuplicatePath(node.path.as_str().to_string()));
            }
        }
        Ok(Self { by_path })
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&'a Node> {
        self.by_path.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// The nearest ancestor present in the index, if any.
    ///
    /// A missing ancestor is an implicit object, which is valid; callers must
    /// not assume every parent prefix materializes as a node.
    pub fn parent_of(&self, node: &Node) -> Option<&'a Node> {
        let mut current = node.path.parent();
        while let Some(parent) = current {
            if let Some(found) = self.get(parent.as_str()) {
                return Some(found);
            }
            current = parent.parent();
        }
        None
    }

    /// Direct children of an object path, in path order.
    pub fn children_of(&self, object_path: &str) -> Vec<&'a Node> {
        let prefix = if object_path.ends_with('.') {
            object_path.to_string()
        } else {
            format!("{object_path}.")
        };

        self.by_path
            .range(prefix.as_str()..)
            .take_while(|(path, _)| path.starts_with(prefix.as_str()))
            .filter(|(path, _)| {
                let rest = &path[prefix.len()..];
                let rest = rest.strip_suffix('.').unwrap_or(rest);
                !rest.is_empty() && !rest.contains('.')
            })
            .map(|(_, node)| *node)
            .collect()
    }

    /// Nodes in path order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Node> + '_ {
        self.by_path.values().copied()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.by_path.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ParameterPath;
    use crate::types::{AccessLevel, DataType};

    fn node(path: &str) -> Node {
        Node::new(
            ParameterPath::parse(path).unwrap(),
            DataType::String,
            AccessLevel::ReadOnly,
        )
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let nodes = vec![node("Device.WiFi.Radio.1.SSID"), node("Device.WiFi.Radio.1.SSID")];
        let err = PathIndex::build(&nodes).unwrap_err();
        assert_eq!(err, DuplicatePath("Device.WiFi.Radio.1.SSID".to_string()));
    }

    #[test]
    fn test_parent_resolution_skips_implicit_objects() {
        // "Device.WiFi.Radio.1." is absent: an implicit object.
        let nodes = vec![node("Device.WiFi."), node("Device.WiFi.Radio.1.Channel")];
        let index = PathIndex::build(&nodes).unwrap();
        let child = index.get("Device.WiFi.Radio.1.Channel").unwrap();
        let parent = index.parent_of(child).unwrap();
        assert_eq!(parent.path.as_str(), "Device.WiFi.");
    }

    #[test]
    fn test_children_are_direct_only() {
        let nodes = vec![
            node("Device.WiFi."),
            node("Device.WiFi.Radio.1."),
            node("Device.WiFi.Radio.1.Channel"),
            node("Device.WiFi.Radio.1.SSID"),
            node("Device.WiFi.Radio.1.Stats.Noise"),
        ];
        let index = PathIndex::build(&nodes).unwrap();

        let children = index.children_of("Device.WiFi.Radio.1.");
        let paths: Vec<_> = children.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Device.WiFi.Radio.1.Channel", "Device.WiFi.Radio.1.SSID"]
        );
    }

    #[test]
    fn test_iteration_is_sorted() {
        let nodes = vec![node("Device.WiFi.Radio.2.SSID"), node("Device.WiFi.Radio.1.SSID")];
        let index = PathIndex::build(&nodes).unwrap();
        let paths: Vec<_> = index.paths().collect();
        assert_eq!(
            paths,
            vec!["Device.WiFi.Radio.1.SSID", "Device.WiFi.Radio.2.SSID"]
        );
    }
}
