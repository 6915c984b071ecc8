//! Difference records and comparison reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tr181_core::{Node, Severity, SourceInfo};

/// What disagreed between the two sources at one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    OnlyInSource1,
    OnlyInSource2,
    TypeMismatch,
    AccessMismatch,
    ValueMismatch,
    RangeMismatch,
}

impl DifferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnlyInSource1 => "only_in_source1",
            Self::OnlyInSource2 => "only_in_source2",
            Self::TypeMismatch => "type_mismatch",
            Self::AccessMismatch => "access_mismatch",
            Self::ValueMismatch => "value_mismatch",
            Self::RangeMismatch => "range_mismatch",
        }
    }
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrepancy found by the comparison engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub path: String,
    pub kind: DifferenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source1_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source2_value: Option<Value>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Difference {
    pub fn new(path: impl Into<String>, kind: DifferenceKind, severity: Severity) -> Self {
        Self {
            path: path.into(),
            kind,
            source1_value: None,
            source2_value: None,
            severity,
            metadata: Map::new(),
        }
    }

    pub fn with_values(
        mut self,
        source1_value: impl Into<Value>,
        source2_value: impl Into<Value>,
    ) -> Self {
        self.source1_value = Some(source1_value.into());
        self.source2_value = Some(source2_value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Totals per kind and per source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total_source1: usize,
    pub total_source2: usize,
    pub common: usize,
    pub total_differences: usize,
    pub by_kind: BTreeMap<String, usize>,
    /// Count of differences at error severity
    pub errors: usize,
    /// Count of differences at warning severity
    pub warnings: usize,
}

/// The pure comparison output, before source descriptors and timing attach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub only_in_source1: Vec<Node>,
    pub only_in_source2: Vec<Node>,
    pub differences: Vec<Difference>,
    pub summary: ComparisonSummary,
}

impl ComparisonOutcome {
    pub fn is_identical(&self) -> bool {
        self.only_in_source1.is_empty()
            && self.only_in_source2.is_empty()
            && self.differences.is_empty()
    }
}

/// The comparison report consumed by external renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub source1: SourceInfo,
    pub source2: SourceInfo,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_serde_spelling() {
        assert_eq!(
            serde_json::to_string(&DifferenceKind::OnlyInSource1).unwrap(),
            "\"only_in_source1\""
        );
        assert_eq!(
            serde_json::to_string(&DifferenceKind::RangeMismatch).unwrap(),
            "\"range_mismatch\""
        );
    }

    #[test]
    fn test_difference_serde() {
        let diff = Difference::new(
            "Device.WiFi.Radio.1.Channel",
            DifferenceKind::ValueMismatch,
            Severity::Info,
        )
        .with_values(json!(6), json!(11))
        .with_metadata("coerced_as", "unsignedInt");

        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(value["kind"], "value_mismatch");
        assert_eq!(value["severity"], "info");
        let back: Difference = serde_json::from_value(value).unwrap();
        assert_eq!(back, diff);
    }
}
