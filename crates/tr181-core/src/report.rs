//! Validation finding accumulator shared by the validator, extractors, and engines

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Accumulated validation findings for a node or document
///
/// Errors mark the report invalid; warnings do not. Findings flow outward
/// only and never abort a comparison on their own.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

// Serialized with an explicit validity flag so renderers need not derive it.
impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationReport", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Fold another report's findings into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// True when there is nothing to report at all.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("validation passed");
        }
        if !self.errors.is_empty() {
            write!(f, "{} error(s)", self.errors.len())?;
            if !self.warnings.is_empty() {
                f.write_str("; ")?;
            }
        }
        if !self.warnings.is_empty() {
            write!(f, "{} warning(s)", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Aggregate statistics over a batch of per-node validation reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_nodes: usize,
    pub valid_nodes: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl ValidationSummary {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a ValidationReport>) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.total_nodes += 1;
            if report.is_valid() {
                summary.valid_nodes += 1;
            }
            summary.total_errors += report.errors.len();
            summary.total_warnings += report.warnings.len();
        }
        summary
    }

    pub fn validation_rate(&self) -> f64 {
        if self.total_nodes == 0 {
            1.0
        } else {
            self.valid_nodes as f64 / self.total_nodes as f64
        }
    }
}
