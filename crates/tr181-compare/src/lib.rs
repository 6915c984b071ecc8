//! Comparison engines for TR-181 node trees
//!
//! [`ComparisonEngine`] computes set differences and attribute diffs between
//! two extraction results. [`EnhancedComparisonEngine`] layers per-node
//! validation on top and, given a live device extractor, probes declared
//! event subscriptions and function calls.

mod diff;
mod engine;
mod enhanced;

pub use diff::{
    ComparisonOutcome, ComparisonReport, ComparisonSummary, Difference, DifferenceKind,
};
pub use engine::{CompareOptions, ComparisonEngine};
pub use enhanced::{
    ComplianceSummary, EnhancedComparisonEngine, EnhancedComparisonReport, EventTestOutcome,
    FunctionTestOutcome, ProbeStatus,
};
