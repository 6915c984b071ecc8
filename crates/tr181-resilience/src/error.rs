//! Error taxonomy shared across the comparator pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use ulid::Ulid;

/// Result alias used throughout the comparator crates
pub type Result<T> = std::result::Result<T, ComparatorError>;

/// Classification of comparator errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Transport connect/establish failed
    Connection,
    /// Credentials rejected
    Authentication,
    /// Operation exceeded its deadline
    Timeout,
    /// Malformed or unexpected transport response
    Protocol,
    /// Input data violates declared structure
    Validation,
    /// Loader or factory received invalid configuration
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
            Self::Validation => "validation",
            Self::Configuration => "configuration",
        }
    }

    pub fn default_severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection | Self::Authentication | Self::Protocol => ErrorSeverity::High,
            Self::Timeout | Self::Validation => ErrorSeverity::Medium,
            Self::Configuration => ErrorSeverity::Critical,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an error for reporting purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context recorded with every error: where it happened and on which attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: String,
    pub component: String,
    pub attempt: u32,
    /// Opaque id linking this error to the log events it caused
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            attempt: 1,
            correlation_id: Ulid::new().to_string(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new("unknown", "unknown")
    }
}

/// A suggested recovery step attached to an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryHint {
    pub action: String,
    pub description: String,
}

impl RecoveryHint {
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            description: description.into(),
        }
    }
}

/// Error type carried through every pipeline stage
///
/// Each error has a kind, a one-line human message, context with a
/// correlation id, a severity, and recovery hints. Transport causes are
/// chained through `source`.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct ComparatorError {
    kind: ErrorKind,
    message: String,
    severity: ErrorSeverity,
    transient: bool,
    context: ErrorContext,
    recovery: Vec<RecoveryHint>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ComparatorError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: kind.default_severity(),
            transient: false,
            context: ErrorContext::default(),
            recovery: Vec::new(),
            source: None,
        }
    }

    /// Transport connect/establish failure; retryable.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
            .with_hint("retry", "retry the connection with exponential backoff")
            .with_hint("check_network", "verify network connectivity and endpoint availability")
    }

    /// Rejected credentials; not retryable.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
            .with_hint("check_credentials", "verify the configured credentials or tokens")
    }

    /// Deadline exceeded; retryable.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
            .with_hint("increase_timeout", "increase the operation deadline")
            .with_hint("retry_smaller_batch", "retry with a smaller batch size")
    }

    /// Malformed or unexpected transport response.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
            .with_hint("check_protocol_version", "verify protocol version compatibility")
    }

    /// Input data violating declared structure; not retryable.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
            .with_hint("check_data_format", "verify the data matches the TR-181 conventions")
    }

    /// Invalid configuration handed to a loader or factory; fatal.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
            .with_hint("check_config", "verify the configuration file and its values")
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_operation(
        mut self,
        operation: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        self.context.operation = operation.into();
        self.context.component = component.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_hint(mut self, action: impl Into<String>, description: impl Into<String>) -> Self {
        self.recovery.push(RecoveryHint::new(action, description));
        self
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Mark a protocol error as transiently coded, making it retryable.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ErrorContext {
        &mut self.context
    }

    pub fn correlation_id(&self) -> &str {
        &self.context.correlation_id
    }

    pub fn recovery_hints(&self) -> &[RecoveryHint] {
        &self.recovery
    }

    /// Whether the retry wrapper may attempt this error again.
    ///
    /// Connection and timeout failures are retryable; protocol failures only
    /// when transient-coded; everything else surfaces immediately.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Connection | ErrorKind::Timeout => true,
            ErrorKind::Protocol => self.transient,
            _ => false,
        }
    }

    /// One-line human message followed by recovery suggestions.
    pub fn user_message(&self) -> String {
        let mut message = format!("{self}");
        if !self.recovery.is_empty() {
            message.push_str("\nSuggested actions:");
            for (i, hint) in self.recovery.iter().enumerate() {
                message.push_str(&format!("\n{}. {}", i + 1, hint.description));
            }
        }
        message
    }
}
