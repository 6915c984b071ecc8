//! Process-wide registry of hook factories

use crate::config::DeviceConfig;
use crate::hook::Hook;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tr181_resilience::{ComparatorError, Result};
use tracing::debug;

/// Factory producing a hook for a device configuration
pub type HookFactory = Arc<dyn Fn(&DeviceConfig) -> Result<Box<dyn Hook>> + Send + Sync>;

/// Maps a transport type string to its hook factory
///
/// Extractors resolve hooks through this registry only; concrete transports
/// register themselves at startup.
#[derive(Default)]
pub struct HookRegistry {
    factories: DashMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a transport type, replacing any previous one.
    pub fn register<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&DeviceConfig) -> Result<Box<dyn Hook>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        debug!(kind = %kind, "Registering hook factory");
        self.factories.insert(kind, Arc::new(factory));
    }

    /// Create a hook for the configuration's transport type.
    pub fn create(&self, config: &DeviceConfig) -> Result<Box<dyn Hook>> {
        config.validate()?;
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            ComparatorError::configuration(format!(
                "no hook registered for type '{}'",
                config.kind
            ))
            .with_metadata("available", self.supported_types().join(","))
        })?;
        factory(config)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered transport types, sorted.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.factories.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<HookRegistry>> = OnceLock::new();

/// The process-wide hook registry.
pub fn global_registry() -> Arc<HookRegistry> {
    GLOBAL_REGISTRY
        .get_or_init(|| Arc::new(HookRegistry::new()))
        .clone()
}
