//! Validation engine for TR-181 nodes
//!
//! Path syntax, data-type coercion, and value-range checks against TR-181
//! conventions. The coercion matrix is pinned as data in [`COERCION_TABLE`]
//! so the comparison engine and the validator agree on what a value means.

mod coercion;
mod validator;

pub use coercion::{coerce, is_native, CoercionError, CoercionRule, COERCION_TABLE};
pub use validator::{range_violations, Validator};
