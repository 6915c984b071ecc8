//! Process-wide error reporting

use crate::error::{ComparatorError, ErrorSeverity};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Snapshot of a reported error kept in the reporter history
#[derive(Debug, Clone, Serialize)]
pub struct ReportedError {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub severity: ErrorSeverity,
    pub message: String,
    pub operation: String,
    pub component: String,
    pub correlation_id: String,
}

/// Aggregate view over recently reported errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
}

/// Centralized error reporter
///
/// One instance is shared process-wide; it may be replaced at startup but not
/// during operation. Reporting also emits a `tracing` event at a level
/// matching the error severity, carrying the correlation id that links log
/// output back to the error.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    history: Mutex<Vec<ReportedError>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, err: &ComparatorError) {
        let entry = ReportedError {
            timestamp: Utc::now(),
            kind: err.kind().as_str().to_string(),
            severity: err.severity(),
            message: err.message().to_string(),
            operation: err.context().operation.clone(),
            component: err.context().component.clone(),
            correlation_id: err.correlation_id().to_string(),
        };

        match err.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => error!(
                kind = %err.kind(),
                component = %entry.component,
                correlation_id = %entry.correlation_id,
                "{}",
                err.message()
            ),
            ErrorSeverity::Medium => warn!(
                kind = %err.kind(),
                component = %entry.component,
                correlation_id = %entry.correlation_id,
                "{}",
                err.message()
            ),
            ErrorSeverity::Low => info!(
                kind = %err.kind(),
                component = %entry.component,
                correlation_id = %entry.correlation_id,
                "{}",
                err.message()
            ),
        }

        self.history.lock().push(entry);
    }

    pub fn history(&self) -> Vec<ReportedError> {
        self.history.lock().clone()
    }

    pub fn summary(&self) -> ErrorSummary {
        let history = self.history.lock();
        let mut summary = ErrorSummary {
            total: history.len(),
            ..Default::default()
        };
        for entry in history.iter() {
            *summary.by_kind.entry(entry.kind.clone()).or_default() += 1;
            *summary
                .by_severity
                .entry(entry.severity.as_str().to_string())
                .or_default() += 1;
        }
        summary
    }

    pub fn clear(&self) {
        self.history.lock().clear();
    }
}

static GLOBAL_REPORTER: OnceLock<Arc<ErrorReporter>> = OnceLock::new();

/// Install a reporter as the process-wide instance.
///
/// May only succeed before the first use; returns `false` once a reporter is
/// already active.
pub fn install_reporter(reporter: Arc<ErrorReporter>) -> bool {
    GLOBAL_REPORTER.set(reporter).is_ok()
}

/// The process-wide reporter, creating the default one on first use.
pub fn global_reporter() -> Arc<ErrorReporter> {
    GLOBAL_REPORTER
        .get_or_init(|| Arc::new(ErrorReporter::new()))
        .clone()
}

/// Report an error through the process-wide reporter.
pub fn report_error(err: &ComparatorError) {
    global_reporter().report(err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_and_summary() {
        let reporter = ErrorReporter::new();
        reporter.report(&ComparatorError::connection("refused"));
        reporter.report(&ComparatorError::connection("reset"));
        reporter.report(&ComparatorError::validation("bad path"));

        let summary = reporter.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_kind["connection"], 2);
        assert_eq!(summary.by_kind["validation"], 1);
        assert_eq!(summary.by_severity["high"], 2);

        reporter.clear();
        assert_eq!(reporter.summary().total, 0);
    }

    #[test]
    fn test_snapshot_carries_correlation_id() {
        let reporter = ErrorReporter::new();
        let err = ComparatorError::timeout("slow").with_operation("fetch", "cwmp_extractor");
        reporter.report(&err);

        let history = reporter.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].component, "cwmp_extractor");
        assert_eq!(history[0].correlation_id, err.correlation_id());
    }
}
