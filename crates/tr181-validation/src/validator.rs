//! TR-181 node validation

use crate::coercion::{coerce, is_native};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tr181_core::{Node, ParameterPath, ValidationReport, ValueRange};

/// Validates paths, data types, and value constraints of TR-181 nodes
///
/// Two toggles adjust behavior per source:
/// - `allow_templates` accepts `{i}` placeholders; requirement documents turn
///   this on, extracted data never does.
/// - `lenient` downgrades string representations of typed values to warnings,
///   for CWMP-origin sources where everything arrives as strings.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    allow_templates: bool,
    lenient: bool,
}

impl Validator {
    /// Strict validator for extracted data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator for requirement documents: `{i}` placeholders allowed.
    pub fn for_requirements() -> Self {
        Self {
            allow_templates: true,
            lenient: false,
        }
    }

    /// Lenient validator for CWMP-origin data.
    pub fn lenient() -> Self {
        Self {
            allow_templates: false,
            lenient: true,
        }
    }

    /// Check path syntax without constructing a node.
    pub fn validate_path(&self, path: &str) -> ValidationReport {
        let mut report = ValidationReport::new();
        let parsed = if self.allow_templates {
            ParameterPath::parse_template(path)
        } else {
            ParameterPath::parse(path)
        };
        if let Err(err) = parsed {
            report.add_error(format!("invalid path '{path}': {err}"));
        }
        report
    }

    /// Validate a node: structure, path, constraint specification, and its
    /// own value when present.
    pub fn validate_node(&self, node: &Node) -> ValidationReport {
        let mut report = self.validate_path(node.path.as_str());

        if node.name.is_empty() {
            report.add_error(format!("node {} has an empty name", node.path));
        } else if node.name != node.path.name() {
            report.add_warning(format!(
                "node {} name '{}' does not match its last path segment",
                node.path, node.name
            ));
        }

        if node.is_object != node.path.is_object() {
            report.add_warning(format!(
                "node {} object flag disagrees with its trailing-dot form",
                node.path
            ));
        }

        self.check_custom_rules(node, &mut report);

        if let Some(range) = &node.value_range {
            self.check_range_spec(node, range, &mut report);
        }

        // A node's own value disagreeing with its own declaration is an
        // authoring inconsistency: surfaced as warnings, the node is kept.
        if let Some(value) = &node.value {
            let value_report = self.validate_value(node, value);
            for finding in value_report.errors {
                report.add_warning(finding);
            }
            for finding in value_report.warnings {
                report.add_warning(finding);
            }
        }

        report
    }

    /// Validate a candidate value against a node's declared type and range.
    pub fn validate_value(&self, node: &Node, value: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();

        let canonical = match coerce(node.data_type, value) {
            Ok(canonical) => {
                if !is_native(node.data_type, value) && node.data_type != tr181_core::DataType::String
                {
                    let finding = format!(
                        "{}: {} value given as string representation {}",
                        node.path, node.data_type, value
                    );
                    if self.lenient {
                        report.add_warning(finding);
                    } else {
                        report.add_error(finding);
                    }
                }
                canonical
            }
            Err(err) => {
                report.add_error(format!("{}: {}", node.path, err));
                return report;
            }
        };

        if let Some(range) = &node.value_range {
            self.check_range(node, range, &canonical, &mut report);
        }

        report
    }

    /// Validate a batch of nodes, returning per-path reports.
    ///
    /// Batch-level rules run here: duplicate paths and custom/standard
    /// collisions at the same stem are errors; event and function parameter
    /// references to absent paths are warnings.
    pub fn validate_nodes(&self, nodes: &[Node]) -> Vec<(String, ValidationReport)> {
        let mut seen: HashMap<&str, bool> = HashMap::new();
        let present: std::collections::HashSet<&str> =
            nodes.iter().map(|n| n.path.as_str()).collect();

        let mut results = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut report = self.validate_node(node);

            match seen.get(node.path.as_str()) {
                Some(&was_custom) if was_custom != node.is_custom => {
                    report.add_error(format!(
                        "custom and standard definitions collide at {}",
                        node.path
                    ));
                }
                Some(_) => {
                    report.add_error(format!("duplicate node path {}", node.path));
                }
                None => {
                    seen.insert(node.path.as_str(), node.is_custom);
                }
            }

            for event in &node.events {
                for parameter in &event.parameters {
                    if !present.contains(parameter.as_str()) {
                        report.add_warning(format!(
                            "event {} references absent parameter {parameter}",
                            event.name
                        ));
                    }
                }
            }
            for function in &node.functions {
                for parameter in function
                    .input_parameters
                    .iter()
                    .chain(&function.output_parameters)
                {
                    if !present.contains(parameter.as_str()) {
                        report.add_warning(format!(
                            "function {} references absent parameter {parameter}",
                            function.name
                        ));
                    }
                }
            }

            results.push((node.path.as_str().to_string(), report));
        }
        results
    }

    fn check_custom_rules(&self, node: &Node, report: &mut ValidationReport) {
        if node.is_custom && !node.path.has_vendor_segment() {
            report.add_warning(format!(
                "custom node {} lies outside the vendor-reserved namespace",
                node.path
            ));
        }
        if !node.is_custom && node.path.is_custom() {
            report.add_warning(format!(
                "node {} is outside the standard namespace but not marked custom",
                node.path
            ));
        }
    }

    fn check_range_spec(&self, node: &Node, range: &ValueRange, report: &mut ValidationReport) {
        if let (Some(min), Some(max)) = (&range.min, &range.max) {
            if let (Some(min), Some(max)) = (min.as_f64(), max.as_f64()) {
                if min > max {
                    report.add_error(format!(
                        "{}: range minimum {min} exceeds maximum {max}",
                        node.path
                    ));
                }
            }
        }
        if let Some(pattern) = &range.pattern {
            if let Err(err) = Regex::new(pattern) {
                report.add_error(format!("{}: invalid pattern '{pattern}': {err}", node.path));
            }
        }
        if range.max_length == Some(0) {
            report.add_error(format!("{}: max_length must be positive", node.path));
        }
    }

    fn check_range(
        &self,
        node: &Node,
        range: &ValueRange,
        canonical: &Value,
        report: &mut ValidationReport,
    ) {
        for violation in range_violations(node.data_type, range, canonical) {
            report.add_error(format!("{}: {violation}", node.path));
        }
    }
}

/// Range-constraint violations for a canonical value, as messages.
///
/// An `allowed_values` enumeration short-circuits the remaining checks;
/// numeric bounds are inclusive; patterns must match the full value.
pub fn range_violations(
    data_type: tr181_core::DataType,
    range: &ValueRange,
    canonical: &Value,
) -> Vec<String> {
    let mut violations = Vec::new();

    if let Some(allowed) = &range.allowed_values {
        let matches = allowed.iter().any(|candidate| {
            coerce(data_type, candidate)
                .map(|c| &c == canonical)
                .unwrap_or(candidate == canonical)
        });
        if !matches {
            violations.push(format!("value {canonical} not in allowed values"));
        }
        return violations;
    }

    if let Some(numeric) = canonical.as_f64() {
        if let Some(min) = range.min.as_ref().and_then(|n| n.as_f64()) {
            if numeric < min {
                violations.push(format!("value {numeric} below minimum {min}"));
            }
        }
        if let Some(max) = range.max.as_ref().and_then(|n| n.as_f64()) {
            if numeric > max {
                violations.push(format!("value {numeric} above maximum {max}"));
            }
        }
    }

    if let Some(text) = canonical.as_str() {
        if let Some(max_length) = range.max_length {
            if text.chars().count() > max_length {
                violations.push(format!(
                    "string length {} exceeds maximum {max_length}",
                    text.chars().count()
                ));
            }
        }
        if let Some(pattern) = &range.pattern {
            if let Ok(re) = Regex::new(&format!("^(?:{pattern})$")) {
                if !re.is_match(text) {
                    violations.push(format!(
                        "value '{text}' does not match pattern '{pattern}'"
                    ));
                }
            }
        }
    }

    violations
}
