//! CWMP extractor: recursive discovery and batched retrieval

use crate::assemble::assemble_nodes;
use crate::deadline::with_deadline;
use crate::extractor::Extractor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tr181_core::{Node, SourceInfo, ROOT_PREFIX};
use tr181_hooks::{DeviceConfig, Hook, ParameterAttributes};
use tr181_observe::{global_observer, EventCategory, LogLevel, Observer};
use tr181_resilience::{
    report_error, ComparatorError, DegradationPolicy, ErrorContext, Result, RetryConfig,
    RetryPolicy,
};
use tracing::{debug, warn};

const COMPONENT: &str = "cwmp_extractor";

/// Tunables for the CWMP extractor
#[derive(Debug, Clone)]
pub struct CwmpOptions {
    /// Paths per GetParameterAttributes/Values request
    pub batch_size: usize,
    /// Discovery prunes subtrees beyond this depth
    pub max_depth: usize,
    /// Below this retrieval success rate the extraction fails
    pub min_success_rate: f64,
}

impl Default for CwmpOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_depth: 32,
            min_success_rate: 0.5,
        }
    }
}

/// Outcome of the retrieval phase of the last extraction
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalSummary {
    pub discovered_leaves: usize,
    pub retrieved_leaves: usize,
    /// Failed leaf paths with the failure message
    pub failures: Vec<(String, String)>,
}

impl RetrievalSummary {
    pub fn success_rate(&self) -> f64 {
        if self.discovered_leaves == 0 {
            1.0
        } else {
            self.retrieved_leaves as f64 / self.discovered_leaves as f64
        }
    }
}

/// Extracts the TR-181 tree from a CWMP agent
///
/// Discovery walks prefixes breadth-first through `get_parameter_names`;
/// retrieval fetches attributes and values in fixed-size batches, falling
/// back to per-path requests when a batch fails. The hook connection is
/// acquired on entry and released on every exit path.
pub struct CwmpExtractor {
    hook: Arc<dyn Hook>,
    config: DeviceConfig,
    options: CwmpOptions,
    retry: RetryPolicy,
    degradation: DegradationPolicy,
    observer: Observer,
    connected: Mutex<bool>,
    extracted_at: Mutex<Option<DateTime<Utc>>>,
    last_run: Mutex<Option<RetrievalSummary>>,
}

impl CwmpExtractor {
    pub fn new(hook: Arc<dyn Hook>, config: DeviceConfig) -> Self {
        let retry = RetryPolicy::new(RetryConfig::default().with_max_attempts(config.retry_count));
        let options = CwmpOptions::default();
        let degradation = DegradationPolicy::new(options.min_success_rate);
        Self {
            hook,
            config,
            options,
            retry,
            degradation,
            observer: global_observer(),
            connected: Mutex::new(false),
            extracted_at: Mutex::new(None),
            last_run: Mutex::new(None),
        }
    }

    pub fn with_options(mut self, options: CwmpOptions) -> Self {
        self.degradation = DegradationPolicy::new(options.min_success_rate);
        self.options = options;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    /// Retrieval outcome of the most recent extraction.
    pub fn last_run(&self) -> Option<RetrievalSummary> {
        self.last_run.lock().clone()
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

    /// Breadth-first name discovery from the `Device.` root.
    ///
    /// Returns every discovered path in discovery order and the subset of
    /// leaf paths.
    async fn discover(&self) -> Result<(Vec<String>, Vec<String>)> {
        let mut queue: VecDeque<String> = VecDeque::from([ROOT_PREFIX.to_string()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut all: Vec<String> = Vec::new();
        let mut leaves: Vec<String> = Vec::new();

        while let Some(prefix) = queue.pop_front() {
            if !visited.insert(prefix.clone()) {
                warn!(prefix = %prefix, "Cycle during discovery, skipping prefix");
                continue;
            }

            let depth = prefix.trim_end_matches('.').matches('.').count();
            if depth >= self.options.max_depth {
                warn!(
                    prefix = %prefix,
                    max_depth = self.options.max_depth,
                    "Depth cap reached, pruning subtree"
                );
                continue;
            }

            let names = {
                let context = ErrorContext::new("discover_names", COMPONENT)
                    .with_metadata("prefix", prefix.clone());
                self.retry
                    .run("get_parameter_names", context, || {
                        let hook = self.hook.clone();
                        let prefix = prefix.clone();
                        let deadline = self.config.timeout;
                        async move {
                            with_deadline(
                                deadline,
                                "get_parameter_names",
                                hook.get_parameter_names(&prefix),
                            )
                            .await
                        }
                    })
                    .await?
            };

            for name in names {
                if !seen.insert(name.clone()) {
                    continue;
                }
                all.push(name.clone());
                if name.ends_with('.') {
                    if visited.contains(&name) {
                        warn!(prefix = %name, "Cycle during discovery, not re-enqueueing");
                    } else {
                        queue.push_back(name);
                    }
                } else {
                    leaves.push(name);
                }
            }
        }

        debug!(
            discovered = all.len(),
            leaves = leaves.len(),
            "Discovery finished"
        );
        Ok((all, leaves))
    }

    /// Batched attribute/value retrieval with per-path fallback.
    async fn retrieve(
        &self,
        leaves: &[String],
    ) -> (
        HashMap<String, ParameterAttributes>,
        HashMap<String, Value>,
        Vec<(String, ComparatorError)>,
    ) {
        let mut attributes: HashMap<String, ParameterAttributes> = HashMap::new();
        let mut values: HashMap<String, Value> = HashMap::new();
        let mut failures: Vec<(String, ComparatorError)> = Vec::new();
        let deadline = self.config.timeout;

        for batch in leaves.chunks(self.options.batch_size.max(1)) {
            let batch: Vec<String> = batch.to_vec();
            let hook = self.hook.clone();

            let batch_result: Result<_> = async {
                let attrs = with_deadline(
                    deadline,
                    "get_parameter_attributes",
                    hook.get_parameter_attributes(&batch),
                )
                .await?;
                let vals = with_deadline(
                    deadline,
                    "get_parameter_values",
                    hook.get_parameter_values(&batch),
                )
                .await?;
                Ok((attrs, vals))
            }
            .await;

            match batch_result {
                Ok((attrs, vals)) => {
                    attributes.extend(attrs);
                    values.extend(vals);
                }
                Err(err) => {
                    warn!(
                        batch_size = batch.len(),
                        error = %err,
                        "Batch retrieval failed, falling back to per-path requests"
                    );
                    let hook = self.hook.clone();
                    let partial = self
                        .degradation
                        .run_partial("retrieve_parameter", batch, move |path: String| {
                            let hook = hook.clone();
                            async move {
                                let single = vec![path.clone()];
                                let attrs = with_deadline(
                                    deadline,
                                    "get_parameter_attributes",
                                    hook.get_parameter_attributes(&single),
                                )
                                .await?;
                                let vals = with_deadline(
                                    deadline,
                                    "get_parameter_values",
                                    hook.get_parameter_values(&single),
                                )
                                .await?;
                                Ok((attrs, vals))
                            }
                        })
                        .await;

                    for (attrs, vals) in partial.successful {
                        attributes.extend(attrs);
                        values.extend(vals);
                    }
                    failures.extend(partial.failed);
                }
            }

            // Yield between batches so concurrent extractions stay fair.
            tokio::task::yield_now().await;
        }

        (attributes, values, failures)
    }

    async fn run(&self) -> Result<Vec<Node>> {
        self.connect_with_retry().await?;

        let (all_paths, leaves) = self.discover().await?;
        let (attributes, values, failures) = self.retrieve(&leaves).await;

        let summary = RetrievalSummary {
            discovered_leaves: leaves.len(),
            retrieved_leaves: leaves.len() - failures.len(),
            failures: failures
                .iter()
                .map(|(path, error)| (path.clone(), error.to_string()))
                .collect(),
        };
        let rate = summary.success_rate();
        *self.last_run.lock() = Some(summary);

        if rate < self.options.min_success_rate {
            return Err(ComparatorError::validation(format!(
                "parameter retrieval success rate {:.1}% below minimum {:.1}%",
                rate * 100.0,
                self.options.min_success_rate * 100.0
            ))
            .with_operation("retrieve", COMPONENT)
            .with_metadata(
                "failed_paths",
                json!(failures.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>()),
            ));
        }

        let failed: HashSet<&String> = failures.iter().map(|(path, _)| path).collect();
        let kept: Vec<String> = all_paths
            .into_iter()
            .filter(|path| !failed.contains(path))
            .collect();

        let assembled = assemble_nodes(&kept, &attributes, &values);
        if !assembled.report.warnings.is_empty() {
            self.observer.emit(
                tr181_observe::LogEvent::new(
                    LogLevel::Warning,
                    EventCategory::Extraction,
                    COMPONENT,
                    format!(
                        "node assembly produced {} warning(s)",
                        assembled.report.warnings.len()
                    ),
                )
                .with_context("warnings", json!(assembled.report.warnings)),
            );
        }

        Ok(assembled.nodes)
    }
}

#[async_trait]
impl Extractor for CwmpExtractor {
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

        let result = self.run().await;

        // Release the connection on every exit path.
        if let Err(err) = self.hook.disconnect().await {
            warn!(error = %err, "Disconnect after extraction failed");
        }
        *self.connected.lock() = false;

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
        let mut info = SourceInfo::new("cwmp", self.config.endpoint.clone())
            .with_metadata("device_name", self.config.name.clone())
            .with_metadata("device_type", self.config.kind.clone())
            .with_metadata("timeout_secs", self.config.timeout.as_secs())
            .with_metadata("retry_count", self.config.retry_count)
            .with_metadata("batch_size", self.options.batch_size as u64);
        if let Some(extracted_at) = *self.extracted_at.lock() {
            info.timestamp = extracted_at;
        }
        if let Some(summary) = self.last_run.lock().as_ref() {
            info = info
                .with_metadata("discovered_leaves", summary.discovered_leaves as u64)
                .with_metadata("retrieved_leaves", summary.retrieved_leaves as u64)
                .with_metadata("retrieval_failures", summary.failures.len() as u64);
        }
        info
    }
}
