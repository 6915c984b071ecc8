//! Core types for the TR-181 data-model comparator
//!
//! This crate provides the fundamental types used throughout the comparator:
//! ParameterPath, Node, DataType, AccessLevel, SourceInfo, and the validation
//! report accumulator.

mod index;
mod node;
mod path;
mod report;
mod source;
mod types;

pub use index::{DuplicatePath, PathIndex};
pub use node::{EventDescriptor, FunctionDescriptor, Node, ValueRange};
pub use path::{ParameterPath, PathError, STANDARD_SUBTREES};
pub use report::{ValidationReport, ValidationSummary};
pub use source::SourceInfo;
pub use types::{AccessLevel, DataType, Severity, UnknownDataType};

/// Root prefix every extraction starts from
pub const ROOT_PREFIX: &str = "Device.";
