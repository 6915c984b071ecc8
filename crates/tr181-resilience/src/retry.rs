//! Retry with exponential backoff and jitter

use crate::error::{ComparatorError, ErrorContext, ErrorKind, Result};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the retry wrapper
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Upper bound of the uniform jitter added to each delay
    pub jitter: Duration,
    /// Error kinds eligible for retry; others propagate immediately
    pub retryable_kinds: Vec<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let base_delay = Duration::from_secs(1);
        Self {
            max_attempts: 3,
            base_delay,
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: base_delay / 2,
            retryable_kinds: vec![ErrorKind::Connection, ErrorKind::Timeout, ErrorKind::Protocol],
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.jitter = base_delay / 2;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }
}

/// Executes operations under a [`RetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Backoff delay for a 1-based attempt number, jitter excluded.
    ///
    /// `min(base_delay * backoff_factor^(attempt-1), max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.config.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay = self.config.base_delay.mul_f64(exp);
        delay.min(self.config.max_delay)
    }

    fn should_retry(&self, error: &ComparatorError) -> bool {
        self.config.retryable_kinds.contains(&error.kind()) && error.is_retryable()
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// Non-retryable errors propagate immediately. After exhaustion the last
    /// error is returned with the attempt history attached to its context.
    pub async fn run<T, F, Fut>(
        &self,
        operation_name: &str,
        mut context: ErrorContext,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delays_ms: Vec<u64> = Vec::new();

        for attempt in 1..=self.config.max_attempts.max(1) {
            context.attempt = attempt;
            debug!(
                operation = operation_name,
                attempt,
                max_attempts = self.config.max_attempts,
                "Executing operation"
            );

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            operation = operation_name,
                            attempt, "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) if !self.should_retry(&error) => {
                    debug!(
                        operation = operation_name,
                        kind = %error.kind(),
                        "Non-retryable error, surfacing"
                    );
                    return Err(error.with_context(context));
                }
                Err(error) if attempt == self.config.max_attempts.max(1) => {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        "Operation failed after exhausting retries"
                    );
                    return Err(error
                        .with_context(context)
                        .with_metadata("attempts", attempt)
                        .with_metadata("delays_ms", json!(delays_ms)));
                }
                Err(error) => {
                    let delay = self.delay_for_attempt(attempt) + self.sample_jitter();
                    warn!(
                        operation = operation_name,
                        attempt,
                        kind = %error.kind(),
                        delay_ms = delay.as_millis() as u64,
                        "Operation failed, retrying after backoff"
                    );
                    delays_ms.push(delay.as_millis() as u64);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop returns from its final attempt")
    }

    fn sample_jitter(&self) -> Duration {
        if self.config.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.config.jitter.mul_f64(rand::random::<f64>())
        }
    }
}
