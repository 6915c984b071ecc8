//! Set-difference and attribute-diff logic over node trees

use crate::diff::{
    ComparisonOutcome, ComparisonReport, ComparisonSummary, Difference, DifferenceKind,
};
use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;
use tr181_core::{Node, Severity, SourceInfo};
use tr181_observe::{global_observer, EventCategory, Observer};
use tr181_resilience::{ComparatorError, Result};
use tr181_validation::{coerce, range_violations};

/// Behavior switches for the comparison engine
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Treat `Device.X.` and `Device.X` as the same node instead of
    /// reporting an object/leaf type mismatch
    pub collapse_object_suffix: bool,
}

/// Compares two node lists and emits structured differences
///
/// Output is deterministic: differences are sorted by path then kind, and
/// the only-in lists are in path order.
#[derive(Clone, Default)]
pub struct ComparisonEngine {
    options: CompareOptions,
    observer: Option<Observer>,
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    fn observer(&self) -> Observer {
        self.observer.clone().unwrap_or_else(global_observer)
    }

    /// Compare two node lists.
    ///
    /// Each list must satisfy path uniqueness; duplicates are a validation
    /// error, not a silent overwrite.
    pub fn compare(&self, source1: &[Node], source2: &[Node]) -> Result<ComparisonOutcome> {
        let span = self
            .observer()
            .span(EventCategory::Comparison, "compare", "comparison_engine");

        let result = self.compare_inner(source1, source2);
        span.finish(result.is_ok());
        result
    }

    /// Compare and wrap into the renderer-facing report.
    pub fn report(
        &self,
        source1: SourceInfo,
        nodes1: &[Node],
        source2: SourceInfo,
        nodes2: &[Node],
    ) -> Result<ComparisonReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let outcome = self.compare(nodes1, nodes2)?;
        Ok(ComparisonReport {
            source1,
            source2,
            started_at,
            duration_ms: clock.elapsed().as_secs_f64() * 1000.0,
            outcome,
        })
    }

    fn compare_inner(&self, source1: &[Node], source2: &[Node]) -> Result<ComparisonOutcome> {
        let index1 = self.index(source1)?;
        let index2 = self.index(source2)?;

        let mut differences: Vec<Difference> = Vec::new();
        let mut collided1: HashSet<&str> = HashSet::new();
        let mut collided2: HashSet<&str> = HashSet::new();

        // A stem present as object on one side and leaf on the other is a
        // type mismatch, not a pair of only-in entries.
        if !self.options.collapse_object_suffix {
            let stems2: HashMap<&str, &str> = index2
                .keys()
                .map(|key| (key.strip_suffix('.').unwrap_or(key), *key))
                .collect();
            for key1 in index1.keys() {
                let stem = key1.strip_suffix('.').unwrap_or(key1);
                if let Some(key2) = stems2.get(stem) {
                    if key1 != key2 {
                        collided1.insert(*key1);
                        collided2.insert(*key2);
                        differences.push(
                            Difference::new(
                                stem.to_string(),
                                DifferenceKind::TypeMismatch,
                                Severity::Error,
                            )
                            .with_values(
                                object_or_type(index1[key1]),
                                object_or_type(index2[key2]),
                            )
                            .with_metadata("source1_path", *key1)
                            .with_metadata("source2_path", *key2),
                        );
                    }
                }
            }
        }

        let only_in_source1: Vec<Node> = index1
            .iter()
            .filter(|(key, _)| !index2.contains_key(*key) && !collided1.contains(*key))
            .map(|(_, node)| (*node).clone())
            .collect();
        let only_in_source2: Vec<Node> = index2
            .iter()
            .filter(|(key, _)| !index1.contains_key(*key) && !collided2.contains(*key))
            .map(|(_, node)| (*node).clone())
            .collect();

        let mut common = 0usize;
        for (key, node1) in &index1 {
            if let Some(node2) = index2.get(key) {
                common += 1;
                differences.extend(self.compare_nodes(node1, node2));
            }
        }

        differences.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));

        let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
        let mut errors = 0usize;
        let mut warnings = 0usize;
        for difference in &differences {
            *by_kind.entry(difference.kind.as_str().to_string()).or_default() += 1;
            match difference.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Info => {}
            }
        }
        if !only_in_source1.is_empty() {
            by_kind.insert(
                DifferenceKind::OnlyInSource1.as_str().to_string(),
                only_in_source1.len(),
            );
        }
        if !only_in_source2.is_empty() {
            by_kind.insert(
                DifferenceKind::OnlyInSource2.as_str().to_string(),
                only_in_source2.len(),
            );
        }

        let summary = ComparisonSummary {
            total_source1: source1.len(),
            total_source2: source2.len(),
            common,
            total_differences: differences.len(),
            by_kind,
            errors,
            warnings,
        };

        Ok(ComparisonOutcome {
            only_in_source1,
            only_in_source2,
            differences,
            summary,
        })
    }

    fn index<'a>(&self, nodes: &'a [Node]) -> Result<BTreeMap<&'a str, &'a Node>> {
        let mut index = BTreeMap::new();
        for node in nodes {
            let key = if self.options.collapse_object_suffix {
                node.path.stem()
            } else {
                node.path.as_str()
            };
            if index.insert(key, node).is_some() {
                return Err(ComparatorError::validation(format!(
                    "duplicate node path '{key}' in comparison input"
                ))
                .with_operation("compare", "comparison_engine"));
            }
        }
        Ok(index)
    }

    fn compare_nodes(&self, node1: &Node, node2: &Node) -> Vec<Difference> {
        let mut differences = Vec::new();
        let path = node1.path.stem();

        let types_differ = node1.data_type != node2.data_type;
        if types_differ {
            differences.push(
                Difference::new(path, DifferenceKind::TypeMismatch, Severity::Error)
                    .with_values(node1.data_type.as_str(), node2.data_type.as_str()),
            );
        }
        // Tie-break: with disagreeing types, value and range comparison
        // coerce through the source-1 declared type.
        let effective_type = node1.data_type;

        if node1.access != node2.access {
            differences.push(
                Difference::new(path, DifferenceKind::AccessMismatch, Severity::Warning)
                    .with_values(node1.access.as_str(), node2.access.as_str()),
            );
        }

        let canonical1 = node1
            .value
            .as_ref()
            .map(|value| coerce(effective_type, value).unwrap_or_else(|_| value.clone()));
        let canonical2 = node2
            .value
            .as_ref()
            .map(|value| coerce(effective_type, value).unwrap_or_else(|_| value.clone()));

        if let (Some(canonical1), Some(canonical2)) = (&canonical1, &canonical2) {
            if canonical1 != canonical2 {
                let mut difference =
                    Difference::new(path, DifferenceKind::ValueMismatch, Severity::Info)
                        .with_values(
                            node1.value.clone().unwrap(),
                            node2.value.clone().unwrap(),
                        )
                        .with_metadata("coerced_as", effective_type.as_str());
                if types_differ {
                    difference = difference.with_metadata("type_tiebreak", "source1");
                }
                differences.push(difference);
            }
        }

        // One range finding per path: a value violating the other side's
        // declared range is an error; range declarations that both exist but
        // disagree are a warning. A side without a range declares no
        // constraint and disagrees with nothing.
        let mut violations: Vec<String> = Vec::new();
        if let (Some(range1), Some(canonical2)) = (&node1.value_range, &canonical2) {
            violations.extend(range_violations(effective_type, range1, canonical2));
        }
        if let (Some(range2), Some(canonical1)) = (&node2.value_range, &canonical1) {
            violations.extend(range_violations(effective_type, range2, canonical1));
        }

        if !violations.is_empty() {
            differences.push(
                Difference::new(path, DifferenceKind::RangeMismatch, Severity::Error)
                    .with_values(
                        json!(node1.value_range),
                        node2.value.clone().unwrap_or_else(|| json!(node2.value_range)),
                    )
                    .with_metadata("violations", json!(violations)),
            );
        } else if let (Some(range1), Some(range2)) = (&node1.value_range, &node2.value_range) {
            if range1 != range2 {
                differences.push(
                    Difference::new(path, DifferenceKind::RangeMismatch, Severity::Warning)
                        .with_values(json!(range1), json!(range2)),
                );
            }
        }

        differences
    }
}

fn object_or_type(node: &Node) -> &'static str {
    if node.is_object {
        "object"
    } else {
        node.data_type.as_str()
    }
}
