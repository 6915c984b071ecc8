//! Loading, validating, and atomically saving requirement documents

use crate::document::{RequirementDocument, RequirementNode};
use std::path::{Path, PathBuf};
use tokio::fs;
use tr181_core::ValidationReport;
use tr181_resilience::{ComparatorError, Result};
use tr181_validation::Validator;
use tracing::{debug, warn};

/// On-disk encoding of a requirement document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// Detect by extension, falling back to a content sniff.
    pub fn detect(path: &Path, content: &str) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => {
                let trimmed = content.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    Self::Json
                } else {
                    Self::Yaml
                }
            }
        }
    }
}

/// Manages one requirement document file
///
/// The manager is the only writer of requirement documents. Loading
/// validates the document; saving is atomic (stage to a temp file in the
/// same directory, then rename).
pub struct RequirementManager {
    path: PathBuf,
    validator: Validator,
    document: Option<RequirementDocument>,
}

impl RequirementManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            validator: Validator::for_requirements(),
            document: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached document, if loaded.
    pub fn document(&self) -> Option<&RequirementDocument> {
        self.document.as_ref()
    }

    /// Load and validate the document, caching it on success.
    pub async fn load(&mut self) -> Result<&RequirementDocument> {
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
            .with_operation("load", "requirement_manager"));
        }

        debug!(
            file = %self.path.display(),
            nodes = document.nodes.len(),
            "Loaded requirement document"
        );
        self.document = Some(document);
        Ok(self.document.as_ref().unwrap())
    }

    /// Validate and atomically write a document, then cache it.
    pub async fn save(&mut self, document: RequirementDocument) -> Result<()> {
        let report = validate_document(&self.validator, &document);
        if !report.is_valid() {
            return Err(ComparatorError::validation(format!(
                "cannot save requirement document: {}",
                report.errors.join("; ")
            ))
            .with_operation("save", "requirement_manager"));
        }

        let content = render(&self.path, &document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|err| {
                    ComparatorError::configuration(format!(
                        "cannot create directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }
        }

        // Stage to a temp file in the same directory, then rename.
        let staged = self.path.with_extension(format!(
            "{}.tmp",
            self.path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("out")
        ));
        fs::write(&staged, &content).await.map_err(|err| {
            ComparatorError::configuration(format!(
                "cannot stage requirement document {}: {err}",
                staged.display()
            ))
        })?;
        fs::rename(&staged, &self.path).await.map_err(|err| {
            ComparatorError::configuration(format!(
                "cannot move staged document into place at {}: {err}",
                self.path.display()
            ))
        })?;

        debug!(file = %self.path.display(), "Saved requirement document");
        self.document = Some(document);
        Ok(())
    }

    /// Add a node marked custom, rejecting path conflicts.
    pub async fn add_custom_node(&mut self, node: RequirementNode) -> Result<()> {
        self.ensure_loaded().await?;
        let document = self.document.as_mut().unwrap();

        if document.contains_path(node.path.as_str()) {
            return Err(ComparatorError::validation(format!(
                "node path already declared: {}",
                node.path
            )));
        }
        let node = node.custom();

        let mut probe = document.clone();
        probe.nodes.push(node.clone());
        let report = validate_document(&self.validator, &probe);
        if !report.is_valid() {
            return Err(ComparatorError::validation(format!(
                "invalid custom node {}: {}",
                node.path,
                report.errors.join("; ")
            )));
        }

        document.nodes.push(node);
        Ok(())
    }

    /// Remove a node by path; `false` when absent.
    pub async fn remove_node(&mut self, path: &str) -> Result<bool> {
        self.ensure_loaded().await?;
        let document = self.document.as_mut().unwrap();
        let before = document.nodes.len();
        document.nodes.retain(|node| node.path.as_str() != path);
        Ok(document.nodes.len() < before)
    }

    async fn ensure_loaded(&mut self) -> Result<()> {
        if self.document.is_none() {
            if fs::try_exists(&self.path).await.unwrap_or(false) {
                self.load().await?;
            } else {
                self.document = Some(RequirementDocument::default());
            }
        }
        Ok(())
    }
}

/// Read and parse a requirement document without caching.
pub async fn load_document(path: &Path) -> Result<RequirementDocument> {
    let content = fs::read_to_string(path).await.map_err(|err| {
        ComparatorError::configuration(format!(
            "cannot read requirement document {}: {err}",
            path.display()
        ))
    })?;

    let document = match FileFormat::detect(path, &content) {
        FileFormat::Json => serde_json::from_str(&content).map_err(|err| {
            ComparatorError::validation(format!(
                "invalid JSON in {}: {err}",
                path.display()
            ))
        })?,
        FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|err| {
            ComparatorError::validation(format!(
                "invalid YAML in {}: {err}",
                path.display()
            ))
        })?,
    };
    Ok(document)
}

/// Validate a document: per-node checks plus document-level uniqueness.
pub fn validate_document(validator: &Validator, document: &RequirementDocument) -> ValidationReport {
    let nodes = document.to_nodes();
    let mut combined = ValidationReport::new();
    for (_, report) in validator.validate_nodes(&nodes) {
        combined.merge(report);
    }
    combined
}

fn render(path: &Path, document: &RequirementDocument) -> Result<String> {
    let format = FileFormat::detect(path, "");
    match format {
        FileFormat::Json => serde_json::to_string_pretty(document)
            .map(|mut content| {
                content.push('\n');
                content
            })
            .map_err(|err| {
                ComparatorError::validation(format!("cannot serialize document: {err}"))
            }),
        FileFormat::Yaml => serde_yaml::to_string(document)
            .map_err(|err| ComparatorError::validation(format!("cannot serialize document: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tr181_core::{AccessLevel, DataType, ParameterPath, ValueRange};

    fn sample_document() -> RequirementDocument {
        let channel = RequirementNode::new(
            ParameterPath::parse("Device.WiFi.Radio.1.Channel").unwrap(),
            DataType::UnsignedInt,
            AccessLevel::ReadWrite,
        )
        .with_range(ValueRange {
            min: Some(1.into()),
            max: Some(11.into()),
            ..Default::default()
        });
        let ssid = RequirementNode::new(
            ParameterPath::parse("Device.WiFi.SSID.1.SSID").unwrap(),
            DataType::String,
            AccessLevel::ReadWrite,
        );
        RequirementDocument::new(vec![channel, ssid])
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("wifi.json");

        let mut manager = RequirementManager::new(&file);
        manager.save(sample_document()).await.unwrap();

        let mut reloaded = RequirementManager::new(&file);
        let document = reloaded.load().await.unwrap();
        assert_eq!(document, &sample_document());

        // Canonical re-save is byte-identical.
        let first = std::fs::read_to_string(&file).unwrap();
        let mut again = RequirementManager::new(&file);
        let document = again.load().await.unwrap().clone();
        again.save(document).await.unwrap();
        let second = std::fs::read_to_string(&file).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_yaml_by_extension() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("wifi.yaml");

        let mut manager = RequirementManager::new(&file);
        manager.save(sample_document()).await.unwrap();

        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.contains("nodes:"));

        let mut reloaded = RequirementManager::new(&file);
        assert_eq!(reloaded.load().await.unwrap(), &sample_document());
    }

    #[tokio::test]
    async fn test_content_sniff_without_extension() {
        let dir = TempDir::new().unwrap();

        let json_file = dir.path().join("requirements");
        std::fs::write(
            &json_file,
            r#"{"nodes": [{"path": "Device.WiFi.Radio.1.Channel", "data_type": "int", "access": "read-write"}]}"#,
        )
        .unwrap();
        assert_eq!(load_document(&json_file).await.unwrap().nodes.len(), 1);

        let yaml_file = dir.path().join("requirements2");
        std::fs::write(
            &yaml_file,
            "nodes:\n  - path: Device.WiFi.Radio.1.Channel\n    data_type: int\n    access: read-write\n",
        )
        .unwrap();
        assert_eq!(load_document(&yaml_file).await.unwrap().nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("dup.json");
        std::fs::write(
            &file,
            serde_json::to_string(&json!({
                "nodes": [
                    {"path": "Device.WiFi.Radio.1.Channel", "data_type": "int", "access": "read-write"},
                    {"path": "Device.WiFi.Radio.1.Channel", "data_type": "int", "access": "read-write"}
                ]
            }))
            .unwrap(),
        )
        .unwrap();

        let mut manager = RequirementManager::new(&file);
        let error = manager.load().await.unwrap_err();
        assert!(error.message().contains("duplicate"));
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_type() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(
            &file,
            r#"{"nodes": [{"path": "Device.WiFi.Radio.1.Channel", "data_type": "quaternion", "access": "read-write"}]}"#,
        )
        .unwrap();

        let mut manager = RequirementManager::new(&file);
        assert!(manager.load().await.is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_range() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("range.json");
        std::fs::write(
            &file,
            serde_json::to_string(&json!({
                "nodes": [{
                    "path": "Device.WiFi.Radio.1.Channel",
                    "data_type": "int",
                    "access": "read-write",
                    "value_range": {"min": 11, "max": 1}
                }]
            }))
            .unwrap(),
        )
        .unwrap();

        let mut manager = RequirementManager::new(&file);
        let error = manager.load().await.unwrap_err();
        assert!(error.message().contains("minimum"));
    }

    #[tokio::test]
    async fn test_add_and_remove_custom_node() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.json");

        let mut manager = RequirementManager::new(&file);
        manager.save(sample_document()).await.unwrap();

        let vendor = RequirementNode::new(
            ParameterPath::parse("Device.X_ACME-COM_Turbo.Enable").unwrap(),
            DataType::Boolean,
            AccessLevel::ReadWrite,
        );
        manager.add_custom_node(vendor.clone()).await.unwrap();
        assert_eq!(manager.document().unwrap().custom_nodes().count(), 1);

        // Conflicting path is rejected.
        assert!(manager.add_custom_node(vendor).await.is_err());

        assert!(manager
            .remove_node("Device.X_ACME-COM_Turbo.Enable")
            .await
            .unwrap());
        assert!(!manager
            .remove_node("Device.X_ACME-COM_Turbo.Enable")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("atomic.json");

        let mut manager = RequirementManager::new(&file);
        manager.save(sample_document()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["atomic.json"]);
    }
}
