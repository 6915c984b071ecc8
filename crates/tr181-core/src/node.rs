//! TR-181 node record and its constraint/descriptor bundles

use crate::path::ParameterPath;
use crate::types::{AccessLevel, DataType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value constraints attached to a node
///
/// Missing fields mean "no constraint". `allowed_values` short-circuits the
/// numeric range checks when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl ValueRange {
    /// True when no constraint field is set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.allowed_values.is_none()
            && self.pattern.is_none()
            && self.max_length.is_none()
    }
}

/// Declared event with the parameter paths it reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    pub path: ParameterPath,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Declared function with its input and output parameter paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub path: ParameterPath,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single TR-181 parameter or object
///
/// Nodes are created by an extractor and immutable within a comparison run.
/// `parent` and `children` hold path strings; ownership stays one-way and the
/// per-run [`PathIndex`](crate::PathIndex) resolves them to nodes on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub path: ParameterPath,
    pub name: String,
    pub data_type: DataType,
    pub access: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default)]
    pub is_object: bool,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDescriptor>,
}

impl Node {
    /// Create a node with name, object flag, and custom flag derived from the path.
    pub fn new(path: ParameterPath, data_type: DataType, access: AccessLevel) -> Self {
        let name = path.name().to_string();
        let is_object = path.is_object();
        let is_custom = path.is_custom();
        Self {
            path,
            name,
            data_type,
            access,
            value: None,
            description: None,
            parent: None,
            children: Vec::new(),
            is_object,
            is_custom,
            value_range: None,
            events: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.value_range = Some(range);
        self
    }

    pub fn with_event(mut self, event: EventDescriptor) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_function(mut self, function: FunctionDescriptor) -> Self {
        self.functions.push(function);
        self
    }
}
