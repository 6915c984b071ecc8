//! Operator-requirement documents
//!
//! A requirement document declares the TR-181 nodes an operator expects a
//! device to implement, with constraints. The [`RequirementManager`] is the
//! only writer: it loads JSON/YAML documents (format detection by extension
//! or content sniff), validates them at load time, and writes them back
//! atomically. [`RequirementExtractor`] exposes a document through the
//! uniform extractor interface.

mod document;
mod extractor;
mod manager;

pub use document::{RequirementDocument, RequirementNode};
pub use extractor::RequirementExtractor;
pub use manager::{load_document, validate_document, FileFormat, RequirementManager};
