//! Normalized TR-181 data types and access levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized TR-181 parameter data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "unsignedInt")]
    UnsignedInt,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "unsignedLong")]
    UnsignedLong,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "dateTime")]
    DateTime,
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "hexBinary")]
    HexBinary,
}

impl DataType {
    /// Normalize a raw transport type name.
    ///
    /// Returns the normalized type and whether the raw name was recognized;
    /// unknown names map to `String` so the caller can warn without dropping
    /// the node.
    pub fn from_wire(raw: &str) -> (Self, bool) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" | "xsd:string" => (Self::String, true),
            "int" | "int32" | "integer" | "xsd:int" => (Self::Int, true),
            "unsignedint" | "uint32" | "xsd:unsignedint" => (Self::UnsignedInt, true),
            "long" | "int64" | "xsd:long" => (Self::Long, true),
            "unsignedlong" | "uint64" | "xsd:unsignedlong" => (Self::UnsignedLong, true),
            "boolean" | "bool" | "xsd:boolean" => (Self::Boolean, true),
            "datetime" | "xsd:datetime" => (Self::DateTime, true),
            "base64" | "base64binary" | "xsd:base64binary" => (Self::Base64, true),
            "hexbinary" | "hex" | "xsd:hexbinary" => (Self::HexBinary, true),
            _ => (Self::String, false),
        }
    }

    /// The canonical TR-181 spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::UnsignedInt => "unsignedInt",
            Self::Long => "long",
            Self::UnsignedLong => "unsignedLong",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Base64 => "base64",
            Self::HexBinary => "hexBinary",
        }
    }

    /// True for the four integer types.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::UnsignedInt | Self::Long | Self::UnsignedLong
        )
    }

    /// True for the unsigned integer types.
    pub fn is_unsigned(&self) -> bool {
        matches!(self, Self::UnsignedInt | Self::UnsignedLong)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match DataType::from_wire(s) {
            (ty, true) => Ok(ty),
            (_, false) => Err(UnknownDataType(s.to_string())),
        }
    }
}

/// Error for a type name that no normalization rule covers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data type '{0}'")]
pub struct UnknownDataType(pub String);

/// TR-181 parameter access levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    #[serde(rename = "read-only")]
    ReadOnly,
    #[serde(rename = "read-write")]
    ReadWrite,
    #[serde(rename = "write-only")]
    WriteOnly,
}

impl AccessLevel {
    /// Normalize a raw transport access string; `None` when unrecognized.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "read" | "ro" | "readonly" | "read-only" => Some(Self::ReadOnly),
            "readwrite" | "rw" | "read-write" => Some(Self::ReadWrite),
            "write" | "wo" | "writeonly" | "write-only" => Some(Self::WriteOnly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::ReadWrite => "read-write",
            Self::WriteOnly => "write-only",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to comparison differences and validation findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
