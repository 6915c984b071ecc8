//! Structured observability surface for the TR-181 comparator
//!
//! The [`Observer`] is a broadcast-based sink for structured [`LogEvent`]
//! records. Producers fire events without locking; the channel serializes
//! delivery internally and subscribers consume the stream independently.
//! An `Observer` handle is threaded through constructors; the process-wide
//! default exists only at the top-level composition boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

/// Default channel capacity for event subscribers
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Level of a structured log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Category a structured log event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Extraction,
    Comparison,
    Validation,
    Connection,
    Performance,
    Configuration,
    Error,
    Audit,
}

/// One structured observability record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: EventCategory,
    pub component: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl LogEvent {
    pub fn new(
        level: LogLevel,
        category: EventCategory,
        component: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category,
            component: component.into(),
            message: message.into(),
            correlation_id: None,
            context: Map::new(),
            duration_ms: None,
        }
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

struct ObserverInner {
    sender: broadcast::Sender<LogEvent>,
}

/// Handle for emitting and subscribing to structured events
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct Observer {
    inner: Arc<ObserverInner>,
}

impl Observer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(ObserverInner { sender }),
        }
    }

    /// Emit an event to all subscribers, mirroring it to `tracing`.
    ///
    /// Send errors mean no active subscribers and are ignored.
    pub fn emit(&self, event: LogEvent) {
        match event.level {
            LogLevel::Debug => debug!(
                category = ?event.category,
                component = %event.component,
                "{}",
                event.message
            ),
            LogLevel::Info => info!(
                category = ?event.category,
                component = %event.component,
                "{}",
                event.message
            ),
            LogLevel::Warning => warn!(
                category = ?event.category,
                component = %event.component,
                "{}",
                event.message
            ),
            LogLevel::Error | LogLevel::Critical => error!(
                category = ?event.category,
                component = %event.component,
                "{}",
                event.message
            ),
        }

        let _ = self.inner.sender.send(event);
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.inner.sender.subscribe()
    }

    /// Start a performance span for one logical operation.
    pub fn span(
        &self,
        category: EventCategory,
        operation: impl Into<String>,
        component: impl Into<String>,
    ) -> Span {
        Span {
            observer: self.clone(),
            category,
            operation: operation.into(),
            component: component.into(),
            correlation_id: Ulid::new().to_string(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe alias for sharing an observer
pub type SharedObserver = Arc<Observer>;

/// An in-flight performance span
///
/// Finishing the span emits one performance-category event carrying the
/// operation, start time, duration, and success flag.
pub struct Span {
    observer: Observer,
    category: EventCategory,
    operation: String,
    component: String,
    correlation_id: String,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Span {
    /// Correlation id shared by all events of this operation.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Emit an event within this span, stamped with its correlation id.
    pub fn event(&self, level: LogLevel, message: impl Into<String>) {
        self.observer.emit(
            LogEvent::new(level, self.category, self.component.clone(), message)
                .with_correlation(self.correlation_id.clone()),
        );
    }

    /// Finish the span, emitting its performance record.
    pub fn finish(self, success: bool) {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let level = if success {
            LogLevel::Info
        } else {
            LogLevel::Warning
        };
        self.observer.emit(
            LogEvent::new(
                level,
                EventCategory::Performance,
                self.component,
                format!("{} finished", self.operation),
            )
            .with_correlation(self.correlation_id)
            .with_context("operation", self.operation.clone())
            .with_context("started_at", self.started_at.to_rfc3339())
            .with_context("success", success)
            .with_duration_ms(duration_ms),
        );
    }
}

static GLOBAL_OBSERVER: OnceLock<Observer> = OnceLock::new();

/// Install an observer as the process-wide default.
///
/// Only effective before the first use; returns `false` afterwards.
pub fn install_observer(observer: Observer) -> bool {
    GLOBAL_OBSERVER.set(observer).is_ok()
}

/// The process-wide observer, created on first use.
pub fn global_observer() -> Observer {
    GLOBAL_OBSERVER.get_or_init(Observer::new).clone()
}
