//! Extractor adapter over a requirement document

use crate::manager::{load_document, validate_document, FileFormat};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use tokio::fs;
use tr181_core::{Node, SourceInfo};
use tr181_extractors::Extractor;
use tr181_resilience::{ComparatorError, Result};
use tr181_validation::Validator;
use tracing::warn;

/// Exposes a requirement document through the extractor interface
pub struct RequirementExtractor {
    path: PathBuf,
    validator: Validator,
    loaded_at: Mutex<Option<DateTime<Utc>>>,
    node_count: Mutex<Option<usize>>,
}

impl RequirementExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            validator: Validator::for_requirements(),
            loaded_at: Mutex::new(None),
            node_count: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Extractor for RequirementExtractor {
    async fn extract(&self) -> Result<Vec<Node>> {
        let document = load_document(&self.path).await?;

        let report = validate_document(&self.validator, &document);
        for warning in &report.warnings {
            warn!(file = %self.path.display(), "{warning}");
        }
        if !report.is_valid() {
            return Err(ComparatorError::validation(format!(
                "requirement document {} failed validation: {}",
                self.path.display(),
                report.errors.join("; ")
            ))
            .with_operation("extract", "requirement_extractor"));
        }

        let nodes = document.to_nodes();
        *self.loaded_at.lock() = Some(Utc::now());
        *self.node_count.lock() = Some(nodes.len());
        Ok(nodes)
    }

    async fn validate(&self) -> bool {
        match fs::read_to_string(&self.path).await {
            Ok(content) => match FileFormat::detect(&self.path, &content) {
                FileFormat::Json => {
                    serde_json::from_str::<crate::RequirementDocument>(&content).is_ok()
                }
                FileFormat::Yaml => {
                    serde_yaml::from_str::<crate::RequirementDocument>(&content).is_ok()
                }
            },
            Err(_) => false,
        }
    }

    fn source_info(&self) -> SourceInfo {
        let mut info = SourceInfo::new("requirement", self.path.display().to_string());
        if let Some(loaded_at) = *self.loaded_at.lock() {
            info.timestamp = loaded_at;
        }
        if let Some(count) = *self.node_count.lock() {
            info = info.with_metadata("node_count", count as u64);
        }
        info
    }
}
