//! The pluggable transport boundary

use crate::config::DeviceConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tr181_resilience::Result;

/// Raw attributes a transport reports for one parameter
///
/// Types and access strings are transport spellings; extractors normalize
/// them into the core enums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAttributes {
    #[serde(rename = "type")]
    pub param_type: String,
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

impl ParameterAttributes {
    pub fn new(param_type: impl Into<String>, access: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            access: access.into(),
            notification: None,
        }
    }
}

/// Transport adapter providing the TR-181 parameter RPCs
///
/// A hook instance is owned by at most one extractor at a time.
/// Implementations manage connection state behind `&self`.
///
/// `get_parameter_names` returns the direct and transitive children of the
/// prefix: object paths end in `.`, leaf paths do not, and replies at any
/// depth below the prefix are valid — callers must not assume a single-level
/// response.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn connect(&self, config: &DeviceConfig) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    async fn get_parameter_names(&self, prefix: &str) -> Result<Vec<String>>;

    async fn get_parameter_values(&self, paths: &[String]) -> Result<HashMap<String, Value>>;

    async fn get_parameter_attributes(
        &self,
        paths: &[String],
    ) -> Result<HashMap<String, ParameterAttributes>>;

    async fn set_parameter_values(&self, values: HashMap<String, Value>) -> Result<()>;

    /// Subscribe to event notifications; `false` means the device refused.
    async fn subscribe_to_event(&self, event_path: &str) -> Result<bool>;

    /// Invoke a device function, returning its output parameters.
    async fn call_function(
        &self,
        function_path: &str,
        inputs: Map<String, Value>,
    ) -> Result<Map<String, Value>>;
}

impl std::fmt::Debug for dyn Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Hook")
    }
}
