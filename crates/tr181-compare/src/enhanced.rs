//! Enhanced comparison: validation plus live event and function probing

use crate::diff::ComparisonReport;
use crate::engine::ComparisonEngine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tr181_core::{
    DataType, EventDescriptor, FunctionDescriptor, Node, PathIndex, SourceInfo, ValidationReport,
};
use tr181_extractors::DeviceExtractor;
use tr181_observe::{global_observer, EventCategory, Observer};
use tr181_resilience::Result;
use tr181_validation::Validator;
use tracing::debug;

/// Outcome of one event or function probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Passed,
    Failed,
    Error,
}

/// Result of probing one declared event against the live device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTestOutcome {
    pub name: String,
    pub path: String,
    pub status: ProbeStatus,
    pub message: String,
    pub parameter_findings: ValidationReport,
    pub subscribed: bool,
}

/// Result of probing one declared function against the live device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTestOutcome {
    pub name: String,
    pub path: String,
    pub status: ProbeStatus,
    pub message: String,
    pub input_findings: ValidationReport,
    pub output_findings: ValidationReport,
    pub invoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Map<String, Value>>,
}

/// Pass/fail totals over validation and probe checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub score: f64,
}

/// Comparison report extended with validation and probe results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedComparisonReport {
    #[serde(flatten)]
    pub comparison: ComparisonReport,
    pub validation_results: BTreeMap<String, ValidationReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_test_results: Vec<EventTestOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_test_results: Vec<FunctionTestOutcome>,
    pub compliance: ComplianceSummary,
}

/// Composes the base comparison engine with the validator and the live
/// event/function probes
///
/// Source 1 is the requirement side; source 2 the device side. Probe
/// failures aggregate into the report and never abort the comparison.
#[derive(Clone, Default)]
pub struct EnhancedComparisonEngine {
    engine: ComparisonEngine,
    validator: Validator,
    observer: Option<Observer>,
}

impl EnhancedComparisonEngine {
    /// Engine with strict per-node validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that validates device values leniently, for CWMP-origin
    /// sources where typed values arrive as strings.
    pub fn for_cwmp_device() -> Self {
        Self {
            engine: ComparisonEngine::new(),
            validator: Validator::lenient(),
            observer: None,
        }
    }

    pub fn with_engine(mut self, engine: ComparisonEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    fn observer(&self) -> Observer {
        self.observer.clone().unwrap_or_else(global_observer)
    }

    /// Full enhanced comparison.
    ///
    /// Runs the base comparison, validates each device node's actual value
    /// against the requirement's declared type and constraints, and, when a
    /// live extractor is supplied, probes every declared event subscription
    /// and function call.
    pub async fn compare_with_validation(
        &self,
        source1: SourceInfo,
        requirement_nodes: &[Node],
        source2: SourceInfo,
        device_nodes: &[Node],
        live: Option<&DeviceExtractor>,
    ) -> Result<EnhancedComparisonReport> {
        let span = self.observer().span(
            EventCategory::Comparison,
            "compare_with_validation",
            "enhanced_comparison_engine",
        );

        let comparison = self
            .engine
            .report(source1, requirement_nodes, source2, device_nodes)?;

        let validation_span = self.observer().span(
            EventCategory::Validation,
            "validate_nodes",
            "enhanced_comparison_engine",
        );
        let validation_results = self.validate_common(requirement_nodes, device_nodes);
        validation_span.finish(validation_results.is_ok());
        let validation_results = validation_results?;

        let mut event_test_results = Vec::new();
        let mut function_test_results = Vec::new();
        if let Some(extractor) = live {
            let device_index = PathIndex::build(device_nodes)
                .map_err(|err| tr181_resilience::ComparatorError::validation(err.to_string()))?;
            for node in requirement_nodes {
                for event in &node.events {
                    event_test_results
                        .push(self.probe_event(extractor, event, &device_index).await);
                }
                for function in &node.functions {
                    function_test_results
                        .push(self.probe_function(extractor, function, &device_index).await);
                }
            }
        }

        let compliance =
            compliance_summary(&validation_results, &event_test_results, &function_test_results);

        debug!(
            validated = validation_results.len(),
            events = event_test_results.len(),
            functions = function_test_results.len(),
            "Enhanced comparison finished"
        );
        span.finish(true);

        Ok(EnhancedComparisonReport {
            comparison,
            validation_results,
            event_test_results,
            function_test_results,
            compliance,
        })
    }

    /// Validate device values against the requirement's declared constraints
    /// for every path present on both sides.
    fn validate_common(
        &self,
        requirement_nodes: &[Node],
        device_nodes: &[Node],
    ) -> Result<BTreeMap<String, ValidationReport>> {
        let device_index = PathIndex::build(device_nodes)
            .map_err(|err| tr181_resilience::ComparatorError::validation(err.to_string()))?;

        let mut results = BTreeMap::new();
        for requirement in requirement_nodes {
            let Some(device_node) = device_index.get(requirement.path.as_str()) else {
                continue;
            };
            let mut report = ValidationReport::new();
            if let Some(value) = &device_node.value {
                report.merge(self.validator.validate_value(requirement, value));
            }
            results.insert(requirement.path.as_str().to_string(), report);
        }
        Ok(results)
    }

    async fn probe_event(
        &self,
        extractor: &DeviceExtractor,
        event: &EventDescriptor,
        device_index: &PathIndex<'_>,
    ) -> EventTestOutcome {
        let mut findings = ValidationReport::new();
        for parameter in &event.parameters {
            // Absent parameter references are warnings, not errors.
            if !device_index.contains(parameter) {
                findings.add_warning(format!(
                    "event parameter {parameter} not present on device"
                ));
            }
        }

        let (status, subscribed, message) =
            match extractor.subscribe_event(event.path.as_str()).await {
                Ok(true) => (ProbeStatus::Passed, true, "subscription accepted".to_string()),
                Ok(false) => (
                    ProbeStatus::Failed,
                    false,
                    "subscription refused by device".to_string(),
                ),
                Err(err) => (ProbeStatus::Error, false, err.to_string()),
            };

        EventTestOutcome {
            name: event.name.clone(),
            path: event.path.as_str().to_string(),
            status,
            message,
            parameter_findings: findings,
            subscribed,
        }
    }

    async fn probe_function(
        &self,
        extractor: &DeviceExtractor,
        function: &FunctionDescriptor,
        device_index: &PathIndex<'_>,
    ) -> FunctionTestOutcome {
        let mut input_findings = ValidationReport::new();
        let mut inputs = Map::new();
        for parameter in &function.input_parameters {
            let synthesized = match device_index.get(parameter) {
                Some(node) => neutral_value(node.data_type),
                None => {
                    input_findings.add_warning(format!(
                        "function input {parameter} not present on device"
                    ));
                    json!("")
                }
            };
            inputs.insert(parameter.clone(), synthesized);
        }

        let mut output_findings = ValidationReport::new();
        for parameter in &function.output_parameters {
            if !device_index.contains(parameter) {
                output_findings.add_warning(format!(
                    "function output {parameter} not present on device"
                ));
            }
        }

        match extractor.call_function(function.path.as_str(), inputs).await {
            Ok(outputs) => {
                for parameter in &function.output_parameters {
                    if !outputs.contains_key(parameter) {
                        output_findings.add_warning(format!(
                            "declared output {parameter} missing from function response"
                        ));
                    }
                }
                FunctionTestOutcome {
                    name: function.name.clone(),
                    path: function.path.as_str().to_string(),
                    status: ProbeStatus::Passed,
                    message: format!("function returned {} output(s)", outputs.len()),
                    input_findings,
                    output_findings,
                    invoked: true,
                    outputs: Some(outputs),
                }
            }
            Err(err) => FunctionTestOutcome {
                name: function.name.clone(),
                path: function.path.as_str().to_string(),
                status: ProbeStatus::Error,
                message: err.to_string(),
                input_findings,
                output_findings,
                invoked: false,
                outputs: None,
            },
        }
    }
}

/// Neutral probe value for a declared type.
fn neutral_value(data_type: DataType) -> Value {
    match data_type {
        DataType::String | DataType::Base64 | DataType::HexBinary => json!(""),
        DataType::Int | DataType::UnsignedInt | DataType::Long | DataType::UnsignedLong => json!(0),
        DataType::Boolean => json!(false),
        DataType::DateTime => json!("1970-01-01T00:00:00Z"),
    }
}

fn compliance_summary(
    validation_results: &BTreeMap<String, ValidationReport>,
    events: &[EventTestOutcome],
    functions: &[FunctionTestOutcome],
) -> ComplianceSummary {
    let total_checks = validation_results.len() + events.len() + functions.len();
    let passed_checks = validation_results
        .values()
        .filter(|report| report.is_valid())
        .count()
        + events
            .iter()
            .filter(|outcome| outcome.status == ProbeStatus::Passed)
            .count()
        + functions
            .iter()
            .filter(|outcome| outcome.status == ProbeStatus::Passed)
            .count();

    ComplianceSummary {
        total_checks,
        passed_checks,
        failed_checks: total_checks - passed_checks,
        score: if total_checks == 0 {
            1.0
        } else {
            passed_checks as f64 / total_checks as f64
        },
    }
}
