//! In-memory transports for tests
//!
//! [`StaticHook`] serves a fixed parameter tree; [`FlakyHook`] wraps another
//! hook and injects failures so retry, fallback, and degradation paths can be
//! exercised deterministically.

use crate::config::DeviceConfig;
use crate::hook::{Hook, ParameterAttributes};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use tr181_resilience::{ComparatorError, Result};

/// One parameter served by [`StaticHook`]
#[derive(Debug, Clone)]
pub struct StaticParameter {
    pub param_type: String,
    pub access: String,
    pub value: Option<Value>,
}

#[derive(Default)]
struct StaticState {
    connected: bool,
    connect_count: u32,
    subscriptions: Vec<String>,
    set_calls: Vec<HashMap<String, Value>>,
}

/// Transport serving a fixed in-memory parameter tree
///
/// Leaf registration auto-creates the ancestor object entries, so a tree
/// built from a handful of parameters answers name discovery the way a real
/// agent would. By default `get_parameter_names` returns direct children
/// only; `with_transitive_names` switches to full-subtree replies, which the
/// hook contract equally permits.
pub struct StaticHook {
    tree: BTreeMap<String, StaticParameter>,
    functions: HashMap<String, Map<String, Value>>,
    refused_events: HashSet<String>,
    transitive_names: bool,
    state: Mutex<StaticState>,
}

impl StaticHook {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
            functions: HashMap::new(),
            refused_events: HashSet::new(),
            transitive_names: false,
            state: Mutex::new(StaticState::default()),
        }
    }

    /// Register a leaf parameter, creating ancestor objects as needed.
    pub fn with_parameter(
        mut self,
        path: &str,
        param_type: &str,
        access: &str,
        value: Option<Value>,
    ) -> Self {
        let mut ancestor = String::new();
        let segments: Vec<&str> = path.split('.').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            ancestor.push_str(segment);
            ancestor.push('.');
            self.tree
                .entry(ancestor.clone())
                .or_insert_with(|| StaticParameter {
                    param_type: "object".to_string(),
                    access: "read-only".to_string(),
                    value: None,
                });
        }
        self.tree.insert(
            path.to_string(),
            StaticParameter {
                param_type: param_type.to_string(),
                access: access.to_string(),
                value,
            },
        );
        self
    }

    /// Register a leaf without creating ancestor objects.
    ///
    /// Useful with `with_transitive_names` to model agents that answer a
    /// root query with a flat list of leaves.
    pub fn with_flat_parameter(
        mut self,
        path: &str,
        param_type: &str,
        access: &str,
        value: Option<Value>,
    ) -> Self {
        self.tree.insert(
            path.to_string(),
            StaticParameter {
                param_type: param_type.to_string(),
                access: access.to_string(),
                value,
            },
        );
        self
    }

    /// Register an object entry explicitly.
    pub fn with_object(mut self, path: &str) -> Self {
        self.tree.insert(
            path.to_string(),
            StaticParameter {
                param_type: "object".to_string(),
                access: "read-only".to_string(),
                value: None,
            },
        );
        self
    }

    /// Declare outputs returned by `call_function` for a function path.
    pub fn with_function(mut self, path: &str, outputs: Map<String, Value>) -> Self {
        self.functions.insert(path.to_string(), outputs);
        self
    }

    /// Make `subscribe_to_event` answer `false` for a path.
    pub fn with_refused_event(mut self, path: &str) -> Self {
        self.refused_events.insert(path.to_string());
        self
    }

    /// Answer name queries with the full subtree instead of direct children.
    pub fn with_transitive_names(mut self) -> Self {
        self.transitive_names = true;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn connect_count(&self) -> u32 {
        self.state.lock().connect_count
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state.lock().subscriptions.clone()
    }

    pub fn set_calls(&self) -> Vec<HashMap<String, Value>> {
        self.state.lock().set_calls.clone()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state.lock().connected {
            Ok(())
        } else {
            Err(ComparatorError::connection("not connected to device"))
        }
    }

    fn lookup(&self, path: &str) -> Result<&StaticParameter> {
        self.tree
            .get(path)
            .ok_or_else(|| ComparatorError::protocol(format!("unknown parameter '{path}'")))
    }
}

impl Default for StaticHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for StaticHook {
    async fn connect(&self, _config: &DeviceConfig) -> Result<()> {
        let mut state = self.state.lock();
        state.connected = true;
        state.connect_count += 1;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    async fn get_parameter_names(&self, prefix: &str) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let names = self
            .tree
            .keys()
            .filter(|path| path.starts_with(prefix) && path.as_str() != prefix)
            .filter(|path| {
                if self.transitive_names {
                    return true;
                }
                let rest = &path[prefix.len()..];
                let rest = rest.strip_suffix('.').unwrap_or(rest);
                !rest.is_empty() && !rest.contains('.')
            })
            .cloned()
            .collect();
        Ok(names)
    }

    async fn get_parameter_values(&self, paths: &[String]) -> Result<HashMap<String, Value>> {
        self.ensure_connected()?;
        let mut values = HashMap::new();
        for path in paths {
            let parameter = self.lookup(path)?;
            if let Some(value) = &parameter.value {
                values.insert(path.clone(), value.clone());
            }
        }
        Ok(values)
    }

    async fn get_parameter_attributes(
        &self,
        paths: &[String],
    ) -> Result<HashMap<String, ParameterAttributes>> {
        self.ensure_connected()?;
        let mut attributes = HashMap::new();
        for path in paths {
            let parameter = self.lookup(path)?;
            attributes.insert(
                path.clone(),
                ParameterAttributes::new(&parameter.param_type, &parameter.access),
            );
        }
        Ok(attributes)
    }

    async fn set_parameter_values(&self, values: HashMap<String, Value>) -> Result<()> {
        self.ensure_connected()?;
        for (path, _) in values.iter() {
            let parameter = self.lookup(path)?;
            if parameter.access == "read-only" {
                return Err(ComparatorError::validation(format!(
                    "parameter '{path}' is read-only"
                )));
            }
        }
        self.state.lock().set_calls.push(values);
        Ok(())
    }

    async fn subscribe_to_event(&self, event_path: &str) -> Result<bool> {
        self.ensure_connected()?;
        if self.refused_events.contains(event_path) {
            return Ok(false);
        }
        self.state.lock().subscriptions.push(event_path.to_string());
        Ok(true)
    }

    async fn call_function(
        &self,
        function_path: &str,
        _inputs: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        self.ensure_connected()?;
        self.functions
            .get(function_path)
            .cloned()
            .ok_or_else(|| ComparatorError::protocol(format!("unknown function '{function_path}'")))
    }
}

#[derive(Default)]
struct FlakyState {
    remaining_connect_failures: u32,
}

/// Wrapper injecting deterministic failures into another hook
pub struct FlakyHook<H> {
    inner: H,
    /// Any multi-path value query containing this path fails outright
    poison_batch_member: Option<String>,
    /// Single-path value queries for these paths fail
    failing_value_paths: HashSet<String>,
    state: Mutex<FlakyState>,
}

impl<H: Hook> FlakyHook<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            poison_batch_member: None,
            failing_value_paths: HashSet::new(),
            state: Mutex::new(FlakyState::default()),
        }
    }

    /// Fail the first `count` connect attempts with a timeout error.
    pub fn fail_connects(self, count: u32) -> Self {
        self.state.lock().remaining_connect_failures = count;
        self
    }

    /// Fail every batched value query containing `path`.
    pub fn poison_batch_member(mut self, path: &str) -> Self {
        self.poison_batch_member = Some(path.to_string());
        self
    }

    /// Fail single-path value queries for `path`.
    pub fn fail_value_path(mut self, path: &str) -> Self {
        self.failing_value_paths.insert(path.to_string());
        self
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: Hook> Hook for FlakyHook<H> {
    async fn connect(&self, config: &DeviceConfig) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.remaining_connect_failures > 0 {
                state.remaining_connect_failures -= 1;
                return Err(ComparatorError::timeout("connect timed out"));
            }
        }
        self.inner.connect(config).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.inner.disconnect().await
    }

    async fn get_parameter_names(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.get_parameter_names(prefix).await
    }

    async fn get_parameter_values(&self, paths: &[String]) -> Result<HashMap<String, Value>> {
        if paths.len() > 1 {
            if let Some(poison) = &self.poison_batch_member {
                if paths.iter().any(|p| p == poison) {
                    return Err(ComparatorError::connection("batch request rejected"));
                }
            }
        }
        if paths.len() == 1 && self.failing_value_paths.contains(&paths[0]) {
            return Err(ComparatorError::timeout(format!(
                "value retrieval for '{}' timed out",
                paths[0]
            )));
        }
        self.inner.get_parameter_values(paths).await
    }

    async fn get_parameter_attributes(
        &self,
        paths: &[String],
    ) -> Result<HashMap<String, ParameterAttributes>> {
        self.inner.get_parameter_attributes(paths).await
    }

    async fn set_parameter_values(&self, values: HashMap<String, Value>) -> Result<()> {
        self.inner.set_parameter_values(values).await
    }

    async fn subscribe_to_event(&self, event_path: &str) -> Result<bool> {
        self.inner.subscribe_to_event(event_path).await
    }

    async fn call_function(
        &self,
        function_path: &str,
        inputs: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        self.inner.call_function(function_path, inputs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Authentication;
    use serde_json::json;

    fn config() -> DeviceConfig {
        DeviceConfig::new(
            "lab",
            "static",
            "memory://lab",
            Authentication::Custom {
                params: Map::new(),
            },
        )
    }

    fn wifi_hook() -> StaticHook {
        StaticHook::new()
            .with_parameter(
                "Device.WiFi.Radio.1.Channel",
                "unsignedInt",
                "read-write",
                Some(json!(6)),
            )
            .with_parameter(
                "Device.WiFi.Radio.1.SSID",
                "string",
                "read-write",
                Some(json!("lab")),
            )
            .with_parameter(
                "Device.DeviceInfo.Manufacturer",
                "string",
                "read-only",
                Some(json!("Acme")),
            )
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let hook = wifi_hook();
        assert!(hook.get_parameter_names("Device.").await.is_err());

        hook.connect(&config()).await.unwrap();
        assert!(hook.get_parameter_names("Device.").await.is_ok());

        hook.disconnect().await.unwrap();
        assert!(hook.get_parameter_names("Device.").await.is_err());
    }

    #[tokio::test]
    async fn test_direct_children_only_by_default() {
        let hook = wifi_hook();
        hook.connect(&config()).await.unwrap();

        let names = hook.get_parameter_names("Device.").await.unwrap();
        assert_eq!(names, vec!["Device.DeviceInfo.", "Device.WiFi."]);

        let names = hook.get_parameter_names("Device.WiFi.Radio.1.").await.unwrap();
        assert_eq!(
            names,
            vec!["Device.WiFi.Radio.1.Channel", "Device.WiFi.Radio.1.SSID"]
        );
    }

    #[tokio::test]
    async fn test_transitive_names() {
        let hook = wifi_hook().with_transitive_names();
        hook.connect(&config()).await.unwrap();

        let names = hook.get_parameter_names("Device.WiFi.").await.unwrap();
        assert!(names.contains(&"Device.WiFi.Radio.1.Channel".to_string()));
        assert!(names.contains(&"Device.WiFi.Radio.".to_string()));
    }

    #[tokio::test]
    async fn test_values_and_attributes() {
        let hook = wifi_hook();
        hook.connect(&config()).await.unwrap();

        let paths = vec!["Device.WiFi.Radio.1.Channel".to_string()];
        let values = hook.get_parameter_values(&paths).await.unwrap();
        assert_eq!(values["Device.WiFi.Radio.1.Channel"], json!(6));

        let attributes = hook.get_parameter_attributes(&paths).await.unwrap();
        assert_eq!(attributes["Device.WiFi.Radio.1.Channel"].param_type, "unsignedInt");
    }

    #[tokio::test]
    async fn test_set_respects_access() {
        let hook = wifi_hook();
        hook.connect(&config()).await.unwrap();

        let mut writable = HashMap::new();
        writable.insert("Device.WiFi.Radio.1.Channel".to_string(), json!(11));
        assert!(hook.set_parameter_values(writable).await.is_ok());

        let mut readonly = HashMap::new();
        readonly.insert("Device.DeviceInfo.Manufacturer".to_string(), json!("Evil"));
        assert!(hook.set_parameter_values(readonly).await.is_err());
        assert_eq!(hook.set_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_flaky_connect_recovers() {
        let hook = FlakyHook::new(wifi_hook()).fail_connects(2);

        assert!(hook.connect(&config()).await.is_err());
        assert!(hook.connect(&config()).await.is_err());
        assert!(hook.connect(&config()).await.is_ok());
        assert_eq!(hook.inner().connect_count(), 1);
    }

    #[tokio::test]
    async fn test_flaky_batch_poisoning() {
        let hook = FlakyHook::new(wifi_hook())
            .poison_batch_member("Device.WiFi.Radio.1.SSID")
            .fail_value_path("Device.WiFi.Radio.1.SSID");
        hook.connect(&config()).await.unwrap();

        let batch = vec![
            "Device.WiFi.Radio.1.Channel".to_string(),
            "Device.WiFi.Radio.1.SSID".to_string(),
        ];
        assert!(hook.get_parameter_values(&batch).await.is_err());

        // Per-path fallback: the poisoned member still fails alone, the rest succeed.
        let alone = vec!["Device.WiFi.Radio.1.Channel".to_string()];
        assert!(hook.get_parameter_values(&alone).await.is_ok());
        let failing = vec!["Device.WiFi.Radio.1.SSID".to_string()];
        assert!(hook.get_parameter_values(&failing).await.is_err());
    }
}
