//! Type coercion pinned as a data table
//!
//! The comparison engine and the validator share these rules so that value
//! equality ("int 6 equals string \"6\"") and type acceptance behave
//! identically everywhere. Each rule maps a raw JSON value to the canonical
//! form of its declared type, or rejects it.

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tr181_core::DataType;

/// Rejection of a value that cannot be read as its declared type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("value {value} cannot be coerced to {data_type}")]
pub struct CoercionError {
    pub data_type: DataType,
    /// Compact rendering of the offending value
    pub value: String,
}

/// One row of the coercion matrix
pub struct CoercionRule {
    pub data_type: DataType,
    pub apply: fn(&Value) -> Option<Value>,
}

/// The full coercion matrix, one rule per normalized data type.
pub const COERCION_TABLE: &[CoercionRule] = &[
    CoercionRule {
        data_type: DataType::String,
        apply: coerce_string,
    },
    CoercionRule {
        data_type: DataType::Int,
        apply: coerce_int,
    },
    CoercionRule {
        data_type: DataType::UnsignedInt,
        apply: coerce_unsigned_int,
    },
    CoercionRule {
        data_type: DataType::Long,
        apply: coerce_long,
    },
    CoercionRule {
        data_type: DataType::UnsignedLong,
        apply: coerce_unsigned_long,
    },
    CoercionRule {
        data_type: DataType::Boolean,
        apply: coerce_boolean,
    },
    CoercionRule {
        data_type: DataType::DateTime,
        apply: coerce_date_time,
    },
    CoercionRule {
        data_type: DataType::Base64,
        apply: coerce_base64,
    },
    CoercionRule {
        data_type: DataType::HexBinary,
        apply: coerce_hex_binary,
    },
];

/// Coerce a value to the canonical form of `data_type`.
pub fn coerce(data_type: DataType, value: &Value) -> Result<Value, CoercionError> {
    let rule = COERCION_TABLE
        .iter()
        .find(|rule| rule.data_type == data_type)
        .expect("every data type has a coercion rule");
    (rule.apply)(value).ok_or_else(|| CoercionError {
        data_type,
        value: compact(value),
    })
}

/// True when the value is native to `data_type` with no conversion needed.
///
/// A string `"6"` coerces to int but is not native; the validator uses this
/// to distinguish clean values from string representations.
pub fn is_native(data_type: DataType, value: &Value) -> bool {
    match data_type {
        DataType::String | DataType::DateTime | DataType::Base64 | DataType::HexBinary => {
            value.is_string()
        }
        DataType::Int | DataType::Long => value.as_i64().is_some(),
        DataType::UnsignedInt | DataType::UnsignedLong => value.as_u64().is_some(),
        DataType::Boolean => value.is_boolean(),
    }
}

fn compact(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() > 64 {
        let truncated: String = rendered.chars().take(64).collect();
        format!("{truncated}…")
    } else {
        rendered
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(Value::String(text))
}

fn signed_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        // Fractions are rejected: "6.5" does not parse as i64.
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn unsigned_from(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<Value> {
    let n = signed_from(value)?;
    i32::try_from(n).ok()?;
    Some(Value::from(n))
}

fn coerce_unsigned_int(value: &Value) -> Option<Value> {
    let n = unsigned_from(value)?;
    u32::try_from(n).ok()?;
    Some(Value::from(n))
}

fn coerce_long(value: &Value) -> Option<Value> {
    signed_from(value).map(Value::from)
}

fn coerce_unsigned_long(value: &Value) -> Option<Value> {
    unsigned_from(value).map(Value::from)
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_u64() {
            Some(0) => false,
            Some(1) => true,
            _ => return None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(parsed))
}

fn coerce_date_time(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    let parsed = DateTime::parse_from_rfc3339(text.trim()).ok()?;
    let canonical = parsed
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    Some(Value::String(canonical))
}

fn coerce_base64(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .ok()?;
    Some(Value::String(text.to_string()))
}

fn coerce_hex_binary(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    if text.len() % 2 != 0 || !text.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(Value::String(text.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_accepts_numbers_and_digit_strings() {
        assert_eq!(coerce(DataType::Int, &json!(6)).unwrap(), json!(6));
        assert_eq!(coerce(DataType::Int, &json!("6")).unwrap(), json!(6));
        assert_eq!(coerce(DataType::Int, &json!("-12")).unwrap(), json!(-12));
        assert!(coerce(DataType::Int, &json!("6.5")).is_err());
        assert!(coerce(DataType::Int, &json!(true)).is_err());
    }

    #[test]
    fn test_int_overflow_and_signedness() {
        // i32 overflow
        assert!(coerce(DataType::Int, &json!(3_000_000_000i64)).is_err());
        assert!(coerce(DataType::Long, &json!(3_000_000_000i64)).is_ok());
        // negative rejected for unsigned
        assert!(coerce(DataType::UnsignedInt, &json!(-1)).is_err());
        assert!(coerce(DataType::UnsignedInt, &json!("4294967295")).is_ok());
        assert!(coerce(DataType::UnsignedInt, &json!("4294967296")).is_err());
        assert!(coerce(DataType::UnsignedLong, &json!("4294967296")).is_ok());
    }

    #[test]
    fn test_boolean_spellings() {
        for truthy in ["true", "TRUE", "1", "yes", "on", "On"] {
            assert_eq!(
                coerce(DataType::Boolean, &json!(truthy)).unwrap(),
                json!(true),
                "{truthy}"
            );
        }
        for falsy in ["false", "0", "no", "off"] {
            assert_eq!(coerce(DataType::Boolean, &json!(falsy)).unwrap(), json!(false));
        }
        assert_eq!(coerce(DataType::Boolean, &json!(1)).unwrap(), json!(true));
        assert!(coerce(DataType::Boolean, &json!("maybe")).is_err());
        assert!(coerce(DataType::Boolean, &json!(2)).is_err());
    }

    #[test]
    fn test_string_accepts_any_scalar() {
        assert_eq!(coerce(DataType::String, &json!("x")).unwrap(), json!("x"));
        assert_eq!(coerce(DataType::String, &json!(6)).unwrap(), json!("6"));
        assert_eq!(coerce(DataType::String, &json!(true)).unwrap(), json!("true"));
    }

    #[test]
    fn test_date_time_normalizes_offsets() {
        let zulu = coerce(DataType::DateTime, &json!("2023-01-01T12:00:00Z")).unwrap();
        let offset = coerce(DataType::DateTime, &json!("2023-01-01T13:00:00+01:00")).unwrap();
        assert_eq!(zulu, offset);
        assert!(coerce(DataType::DateTime, &json!("yesterday")).is_err());
    }

    #[test]
    fn test_binary_checks_are_syntactic() {
        assert!(coerce(DataType::Base64, &json!("aGVsbG8=")).is_ok());
        assert!(coerce(DataType::Base64, &json!("not base64!!!")).is_err());
        assert_eq!(
            coerce(DataType::HexBinary, &json!("DEADbeef")).unwrap(),
            json!("deadbeef")
        );
        assert!(coerce(DataType::HexBinary, &json!("abc")).is_err());
        assert!(coerce(DataType::HexBinary, &json!("zz")).is_err());
    }

    #[test]
    fn test_is_native() {
        assert!(is_native(DataType::Int, &json!(6)));
        assert!(!is_native(DataType::Int, &json!("6")));
        assert!(is_native(DataType::String, &json!("6")));
        assert!(is_native(DataType::Boolean, &json!(false)));
        assert!(!is_native(DataType::Boolean, &json!("false")));
    }

    #[test]
    fn test_table_covers_every_type() {
        for ty in [
            DataType::String,
            DataType::Int,
            DataType::UnsignedInt,
            DataType::Long,
            DataType::UnsignedLong,
            DataType::Boolean,
            DataType::DateTime,
            DataType::Base64,
            DataType::HexBinary,
        ] {
            assert!(COERCION_TABLE.iter().any(|rule| rule.data_type == ty));
        }
    }
}
