//! Requirement document shape

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tr181_core::{
    AccessLevel, DataType, EventDescriptor, FunctionDescriptor, Node, ParameterPath, ValueRange,
};

/// One declared node in an operator-requirement document
///
/// A partial node definition: the path plus the expected type, access, and
/// constraints. A present `value` is interpreted as the expected value.
/// Unknown fields are preserved across load/save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementNode {
    pub path: ParameterPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub data_type: DataType,
    pub access: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDescriptor>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl RequirementNode {
    pub fn new(path: ParameterPath, data_type: DataType, access: AccessLevel) -> Self {
        Self {
            path,
            name: None,
            data_type,
            access,
            value: None,
            description: None,
            is_custom: false,
            value_range: None,
            events: Vec::new(),
            functions: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.value_range = Some(range);
        self
    }

    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }

    /// Materialize the full node record this partial definition declares.
    pub fn to_node(&self) -> Node {
        let mut node = Node::new(self.path.clone(), self.data_type, self.access);
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        node.value = self.value.clone();
        node.description = self.description.clone();
        node.is_custom = self.is_custom || self.path.is_custom();
        node.value_range = self.value_range.clone();
        node.events = self.events.clone();
        node.functions = self.functions.clone();
        node
    }
}

/// An operator-requirement document: an unordered set of partial node
/// definitions under the top-level `nodes` key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementDocument {
    pub nodes: Vec<RequirementNode>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl RequirementDocument {
    pub fn new(nodes: Vec<RequirementNode>) -> Self {
        Self {
            nodes,
            extra: Map::new(),
        }
    }

    pub fn custom_nodes(&self) -> impl Iterator<Item = &RequirementNode> {
        self.nodes.iter().filter(|node| node.is_custom)
    }

    pub fn standard_nodes(&self) -> impl Iterator<Item = &RequirementNode> {
        self.nodes.iter().filter(|node| !node.is_custom)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.nodes.iter().any(|node| node.path.as_str() == path)
    }

    /// Full node records for every declared entry.
    pub fn to_nodes(&self) -> Vec<Node> {
        self.nodes.iter().map(RequirementNode::to_node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let raw = json!({
            "version": "1.0",
            "nodes": [{
                "path": "Device.WiFi.Radio.1.Channel",
                "data_type": "unsignedInt",
                "access": "read-write",
                "vendor_note": "keep me"
            }]
        });

        let document: RequirementDocument = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(document.extra["version"], "1.0");
        assert_eq!(document.nodes[0].extra["vendor_note"], "keep me");

        let back = serde_json::to_value(&document).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_template_paths_accepted() {
        let node: RequirementNode = serde_json::from_value(json!({
            "path": "Device.WiFi.Radio.{i}.Channel",
            "data_type": "unsignedInt",
            "access": "read-write"
        }))
        .unwrap();
        assert!(node.path.is_template());
    }

    #[test]
    fn test_to_node_derives_fields() {
        let requirement = RequirementNode::new(
            ParameterPath::parse("Device.WiFi.Radio.1.Channel").unwrap(),
            DataType::UnsignedInt,
            AccessLevel::ReadWrite,
        )
        .with_value(6);

        let node = requirement.to_node();
        assert_eq!(node.name, "Channel");
        assert!(!node.is_object);
        assert_eq!(node.value, Some(json!(6)));
    }
}
