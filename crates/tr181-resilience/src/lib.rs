//! Error taxonomy and resilience helpers for the TR-181 comparator
//!
//! Provides the structured error type threaded through every pipeline stage,
//! retry with exponential backoff and jitter, partial-success aggregation for
//! batch operations, and the process-wide error reporter.

mod degrade;
mod error;
mod reporter;
mod retry;

pub use degrade::{DegradationPolicy, PartialResult};
pub use error::{
    ComparatorError, ErrorContext, ErrorKind, ErrorSeverity, RecoveryHint, Result,
};
pub use reporter::{
    global_reporter, install_reporter, report_error, ErrorReporter, ErrorSummary, ReportedError,
};
pub use retry::{RetryConfig, RetryPolicy};
