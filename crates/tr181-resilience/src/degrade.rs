//! Partial-success aggregation for batch operations

use crate::error::{ComparatorError, Result};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, warn};

/// Outcome of applying an operation to a batch of items
///
/// `successful` and `failed` are ordered by input index regardless of
/// completion order, and `successful.len() + failed.len() == total`.
#[derive(Debug)]
pub struct PartialResult<T, I = String> {
    pub successful: Vec<T>,
    pub failed: Vec<(I, ComparatorError)>,
    pub total: usize,
}

impl<T, I> PartialResult<T, I> {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful.len() as f64 / self.total as f64
        }
    }

    pub fn is_acceptable(&self, min_success_rate: f64) -> bool {
        self.success_rate() >= min_success_rate
    }
}

/// Applies an operation per item, recording failures instead of aborting
#[derive(Debug, Clone)]
pub struct DegradationPolicy {
    pub min_success_rate: f64,
    /// Bound for concurrent execution
    pub max_in_flight: usize,
}

impl Default for DegradationPolicy {
    fn default() -> Self {
        Self {
            min_success_rate: 0.5,
            max_in_flight: 5,
        }
    }
}

impl DegradationPolicy {
    pub fn new(min_success_rate: f64) -> Self {
        Self {
            min_success_rate,
            ..Self::default()
        }
    }

    /// Apply `operation` to each item in sequence, catching per-item errors.
    pub async fn run_partial<I, T, F, Fut>(
        &self,
        operation_name: &str,
        items: Vec<I>,
        operation: F,
    ) -> PartialResult<T, I>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = items.len();
        let mut successful = Vec::new();
        let mut failed = Vec::new();

        for item in items {
            match operation(item.clone()).await {
                Ok(value) => successful.push(value),
                Err(error) => {
                    warn!(operation = operation_name, error = %error, "Item failed");
                    failed.push((item, error));
                }
            }
        }

        debug!(
            operation = operation_name,
            successful = successful.len(),
            total,
            "Partial execution finished"
        );

        PartialResult {
            successful,
            failed,
            total,
        }
    }

    /// Apply `operation` with at most `max_in_flight` items in flight.
    ///
    /// Result ordering is stable by input index regardless of completion
    /// order.
    pub async fn run_partial_concurrent<I, T, F, Fut>(
        &self,
        operation_name: &str,
        items: Vec<I>,
        operation: F,
    ) -> PartialResult<T, I>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = items.len();
        let concurrency = self.max_in_flight.max(1);

        let outcomes: Vec<(I, Result<T>)> = stream::iter(items.into_iter().map(|item| {
            let future = operation(item.clone());
            async move { (item, future.await) }
        }))
        .buffered(concurrency)
        .collect()
        .await;

        let mut successful = Vec::new();
        let mut failed = Vec::new();
        for (item, outcome) in outcomes {
            match outcome {
                Ok(value) => successful.push(value),
                Err(error) => {
                    warn!(operation = operation_name, error = %error, "Item failed");
                    failed.push((item, error));
                }
            }
        }

        debug!(
            operation = operation_name,
            successful = successful.len(),
            total,
            "Bounded-parallel execution finished"
        );

        PartialResult {
            successful,
            failed,
            total,
        }
    }

    /// Surface a validation error when the result falls below the threshold.
    pub fn ensure_acceptable<T, I>(
        &self,
        operation_name: &str,
        partial: &PartialResult<T, I>,
    ) -> Result<()> {
        if partial.is_acceptable(self.min_success_rate) {
            Ok(())
        } else {
            Err(ComparatorError::validation(format!(
                "{} success rate {:.1}% below minimum {:.1}%",
                operation_name,
                partial.success_rate() * 100.0,
                self.min_success_rate * 100.0
            ))
            .with_metadata("successful", partial.successful.len())
            .with_metadata("failed", partial.failed.len())
            .with_hint(
                "lower_threshold",
                "lower the minimum success rate if partial data is acceptable",
            )
            .with_hint("investigate_failures", "inspect the recorded per-item failures"))
        }
    }
}
