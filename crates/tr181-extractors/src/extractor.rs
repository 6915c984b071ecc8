//! The uniform extractor interface

use async_trait::async_trait;
use tr181_core::{Node, SourceInfo};
use tr181_resilience::Result;

/// Produces a normalized TR-181 node set from one source
///
/// Implementations must be safe to re-invoke after a failed `extract`.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Produce the full node set from the source.
    async fn extract(&self) -> Result<Vec<Node>>;

    /// Cheap liveness check; never fails, only answers.
    async fn validate(&self) -> bool;

    /// Descriptor reproduced verbatim in reports.
    fn source_info(&self) -> SourceInfo;
}
