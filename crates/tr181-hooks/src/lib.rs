//! Transport abstraction for the TR-181 comparator
//!
//! A [`Hook`] is the pluggable I/O boundary an extractor drives: connect,
//! name discovery, value/attribute retrieval, writes, event subscription,
//! and function invocation. Concrete transports register factories in the
//! process-wide [`HookRegistry`]; extractors resolve hooks through the
//! registry only.

mod config;
mod hook;
mod registry;
pub mod testing;

pub use config::{Authentication, DeviceConfig};
pub use hook::{Hook, ParameterAttributes};
pub use registry::{global_registry, HookFactory, HookRegistry};
