//! Generic device extractor: a thin adapter over the hook

use crate::assemble::assemble_nodes;
use crate::deadline::with_deadline;
use crate::extractor::Extractor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tr181_core::{Node, SourceInfo, ROOT_PREFIX};
use tr181_hooks::{DeviceConfig, Hook};
use tr181_observe::{global_observer, EventCategory, LogLevel, Observer};
use tr181_resilience::{
    report_error, ComparatorError, ErrorContext, Result, RetryConfig, RetryPolicy,
};
use tracing::warn;

const COMPONENT: &str = "device_extractor";
const BATCH_SIZE: usize = 50;

/// Extracts nodes from a device whose transport answers a root name query
/// with the full subtree
///
/// Also exposes the event-subscription, function-call, and write-access
/// probes the enhanced comparison engine drives.
pub struct DeviceExtractor {
    hook: Arc<dyn Hook>,
    config: DeviceConfig,
    retry: RetryPolicy,
    observer: Observer,
    connected: Mutex<bool>,
    extracted_at: Mutex<Option<DateTime<Utc>>>,
}

impl DeviceExtractor {
    pub fn new(hook: Arc<dyn Hook>, config: DeviceConfig) -> Self {
        let retry = RetryPolicy::new(RetryConfig::default().with_max_attempts(config.retry_count));
        Self {
            hook,
            config,
            retry,
            observer: global_observer(),
            connected: Mutex::new(false),
            extracted_at: Mutex::new(None),
        }
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Connect through the retry policy unless already connected.
    pub async fn ensure_connected(&self) -> Result<()> {
        if *self.connected.lock() {
            return Ok(());
        }
        self.connect_with_retry().await?;
        *self.connected.lock() = true;
        Ok(())
    }

    async fn connect_with_retry(&self) -> Result<()> {
        let context = ErrorContext::new("connect", COMPONENT)
            .with_metadata("endpoint", self.config.endpoint.clone());
        self.retry
            .run("connect", context, || {
                let hook = self.hook.clone();
                let config = self.config.clone();
                async move {
                    with_deadline(config.timeout, "connect", hook.connect(&config)).await
                }
            })
            .await
    }

    /// Release the hook connection.
    pub async fn disconnect(&self) -> Result<()> {
        let result = self.hook.disconnect().await;
        *self.connected.lock() = false;
        result
    }

    /// Attempt an event subscription on the live device.
    pub async fn subscribe_event(&self, event_path: &str) -> Result<bool> {
        self.ensure_connected().await?;
        with_deadline(
            self.config.timeout,
            "subscribe_to_event",
            self.hook.subscribe_to_event(event_path),
        )
        .await
    }

    /// Invoke a device function with the given inputs.
    pub async fn call_function(
        &self,
        function_path: &str,
        inputs: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        self.ensure_connected().await?;
        with_deadline(
            self.config.timeout,
            "call_function",
            self.hook.call_function(function_path, inputs),
        )
        .await
    }

    /// Probe write access per path; a failed set marks the path `false`.
    pub async fn test_write_access(
        &self,
        probes: HashMap<String, Value>,
    ) -> Result<HashMap<String, bool>> {
        self.ensure_connected().await?;
        let mut outcomes = HashMap::with_capacity(probes.len());
        for (path, value) in probes {
            let mut single = HashMap::new();
            single.insert(path.clone(), value);
            let written = with_deadline(
                self.config.timeout,
                "set_parameter_values",
                self.hook.set_parameter_values(single),
            )
            .await
            .is_ok();
            outcomes.insert(path, written);
        }
        Ok(outcomes)
    }

    // Caller holds the connection; `extract` connects before running this.
    async fn run(&self) -> Result<Vec<Node>> {
        let names = with_deadline(
            self.config.timeout,
            "get_parameter_names",
            self.hook.get_parameter_names(ROOT_PREFIX),
        )
        .await?;

        // The hook may answer at any depth; dedupe and order for stable output.
        let mut seen = HashSet::new();
        let mut paths: Vec<String> = names
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();
        paths.sort();

        let leaves: Vec<String> = paths
            .iter()
            .filter(|path| !path.ends_with('.'))
            .cloned()
            .collect();

        let mut attributes = HashMap::new();
        let mut values = HashMap::new();
        for batch in leaves.chunks(BATCH_SIZE) {
            let batch: Vec<String> = batch.to_vec();
            let fetched: Result<_> = async {
                let attrs = with_deadline(
                    self.config.timeout,
                    "get_parameter_attributes",
                    self.hook.get_parameter_attributes(&batch),
                )
                .await?;
                let vals = with_deadline(
                    self.config.timeout,
                    "get_parameter_values",
                    self.hook.get_parameter_values(&batch),
                )
                .await?;
                Ok((attrs, vals))
            }
            .await;

            match fetched {
                Ok((attrs, vals)) => {
                    attributes.extend(attrs);
                    values.extend(vals);
                }
                Err(err) => {
                    warn!(batch_size = batch.len(), error = %err, "Batch skipped");
                }
            }
            tokio::task::yield_now().await;
        }

        let assembled = assemble_nodes(&paths, &attributes, &values);
        Ok(assembled.nodes)
    }
}

#[async_trait]
impl Extractor for DeviceExtractor {
    async fn extract(&self) -> Result<Vec<Node>> {
        let span = self
            .observer
            .span(EventCategory::Extraction, "extract", COMPONENT);

        {
            let mut connected = self.connected.lock();
            if *connected {
                let err = ComparatorError::configuration(
                    "extract re-entered before the previous connection was released",
                )
                .with_operation("extract", COMPONENT);
                span.finish(false);
                return Err(err);
            }
            *connected = true;
        }

        let result = match self.connect_with_retry().await {
            Ok(()) => self.run().await,
            Err(err) => Err(err),
        };

        // Release the connection on every exit path.
        if let Err(err) = self.disconnect().await {
            warn!(error = %err, "Disconnect after extraction failed");
        }

        match &result {
            Ok(nodes) => {
                *self.extracted_at.lock() = Some(Utc::now());
                span.event(LogLevel::Info, format!("extracted {} nodes", nodes.len()));
            }
            Err(err) => report_error(err),
        }
        span.finish(result.is_ok());
        result
    }

    async fn validate(&self) -> bool {
        if *self.connected.lock() {
            return true;
        }
        match with_deadline(self.config.timeout, "connect", self.hook.connect(&self.config)).await
        {
            Ok(()) => {
                let _ = self.hook.disconnect().await;
                true
            }
            Err(_) => false,
        }
    }

    fn source_info(&self) -> SourceInfo {
        let mut info = SourceInfo::new("device", self.config.endpoint.clone())
            .with_metadata("device_name", self.config.name.clone())
            .with_metadata("device_type", self.config.kind.clone())
            .with_metadata("timeout_secs", self.config.timeout.as_secs())
            .with_metadata("retry_count", self.config.retry_count);
        if let Some(extracted_at) = *self.extracted_at.lock() {
            info.timestamp = extracted_at;
        }
        info
    }
}
