//! Deadline enforcement for hook calls

use std::future::Future;
use std::time::Duration;
use tr181_resilience::{ComparatorError, Result};

/// Await `operation` under a deadline, surfacing expiry as a timeout error.
pub async fn with_deadline<T>(
    deadline: Duration,
    what: &str,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => Err(ComparatorError::timeout(format!(
            "{what} exceeded deadline of {}s",
            deadline.as_secs()
        ))
        .with_metadata("deadline_secs", deadline.as_secs())),
    }
}
