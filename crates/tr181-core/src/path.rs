//! Parameter path type representing a dotted TR-181 identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Top-level objects of the standard TR-181 `Device.` namespace.
///
/// A path whose first segment after `Device` is not in this list (and is not
/// an `X_`-prefixed vendor segment) lies outside the standard namespace.
pub const STANDARD_SUBTREES: &[&str] = &[
    "Bridging",
    "DHCPv4",
    "DHCPv6",
    "DNS",
    "DeviceInfo",
    "Ethernet",
    "Firewall",
    "GatewayInfo",
    "Hosts",
    "IP",
    "InterfaceStack",
    "LANConfigSecurity",
    "ManagementServer",
    "NAT",
    "PPP",
    "Routing",
    "Time",
    "UserInterface",
    "Users",
    "WiFi",
];

/// Error type for invalid TR-181 parameter paths
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path cannot be empty")]
    Empty,

    #[error("path must begin with 'Device.'")]
    MissingDeviceRoot,

    #[error("empty path segment")]
    EmptySegment,

    #[error("segment '{0}' must start with an uppercase letter and contain only alphanumeric characters")]
    InvalidSegment(String),

    #[error("instance index '{0}' must be a bare positive integer")]
    InvalidInstanceIndex(String),

    #[error("'{{i}}' placeholders are only allowed in requirement templates")]
    TemplateNotAllowed,
}

/// A canonical TR-181 parameter path (e.g. `Device.WiFi.Radio.1.Channel`)
///
/// Paths begin with `Device`, segments are dot-separated, and a trailing dot
/// marks an object rather than a leaf parameter. Numeric instance indices are
/// part of the path. `{i}` placeholders are accepted only when parsed in
/// template mode, which requirement documents use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParameterPath(String);

impl ParameterPath {
    /// Parse a path from extracted data. `{i}` placeholders are rejected.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, PathError> {
        Self::parse_inner(s.as_ref(), false)
    }

    /// Parse a path from a requirement document, allowing `{i}` placeholders.
    pub fn parse_template(s: impl AsRef<str>) -> Result<Self, PathError> {
        Self::parse_inner(s.as_ref(), true)
    }

    fn parse_inner(s: &str, allow_templates: bool) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let (stem, trailing_dot) = match s.strip_suffix('.') {
            Some(stem) => (stem, true),
            None => (s, false),
        };

        let mut segments = stem.split('.');
        if segments.next() != Some("Device") {
            return Err(PathError::MissingDeviceRoot);
        }

        let mut rest = 0usize;
        for segment in segments {
            rest += 1;
            Self::check_segment(segment, allow_templates)?;
        }

        // Bare "Device" is not a parameter; "Device." is the root object.
        if rest == 0 && !trailing_dot {
            return Err(PathError::MissingDeviceRoot);
        }

        Ok(Self(s.to_string()))
    }

    fn check_segment(segment: &str, allow_templates: bool) -> Result<(), PathError> {
        if segment.is_empty() {
            return Err(PathError::EmptySegment);
        }

        if segment == "{i}" {
            return if allow_templates {
                Ok(())
            } else {
                Err(PathError::TemplateNotAllowed)
            };
        }

        let first = segment.chars().next().unwrap();

        if first.is_ascii_digit() {
            // Instance index: bare positive integer, no leading zeros.
            if first == '0' || !segment.chars().all(|c| c.is_ascii_digit()) {
                return Err(PathError::InvalidInstanceIndex(segment.to_string()));
            }
            return Ok(());
        }

        if !first.is_ascii_uppercase() {
            return Err(PathError::InvalidSegment(segment.to_string()));
        }

        // Vendor segments (X_<OUI>_Name) may carry underscores and hyphens.
        let vendor = segment.starts_with("X_");
        let valid = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || (vendor && (c == '_' || c == '-')));

        if valid {
            Ok(())
        } else {
            Err(PathError::InvalidSegment(segment.to_string()))
        }
    }

    /// The full path string, trailing dot included for objects.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without any trailing dot.
    pub fn stem(&self) -> &str {
        self.0.strip_suffix('.').unwrap_or(&self.0)
    }

    /// True when the path denotes an object container rather than a leaf.
    pub fn is_object(&self) -> bool {
        self.0.ends_with('.')
    }

    /// True when the path contains an `{i}` placeholder.
    pub fn is_template(&self) -> bool {
        self.segments().any(|s| s == "{i}")
    }

    /// Last segment of the path, trailing dot stripped.
    pub fn name(&self) -> &str {
        self.stem().rsplit('.').next().unwrap_or("")
    }

    /// Parent object path (with trailing dot), or `None` for `Device.` itself.
    pub fn parent(&self) -> Option<ParameterPath> {
        let stem = self.stem();
        let (prefix, _) = stem.rsplit_once('.')?;
        Some(ParameterPath(format!("{prefix}.")))
    }

    /// Dot-separated segments, trailing dot ignored.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.stem().split('.')
    }

    /// Number of segments below the `Device` root.
    pub fn depth(&self) -> usize {
        self.segments().count().saturating_sub(1)
    }

    /// First segment below the `Device` root, if any.
    pub fn top_level(&self) -> Option<&str> {
        self.segments().nth(1)
    }

    /// True when the path lies outside the standard TR-181 namespace.
    ///
    /// Vendor extensions use `X_`-prefixed segments; anything else under an
    /// unknown top-level object is treated as custom as well.
    pub fn is_custom(&self) -> bool {
        match self.top_level() {
            Some(top) => top.starts_with("X_") || !STANDARD_SUBTREES.contains(&top),
            None => false,
        }
    }

    /// True when any segment carries the `X_` vendor-extension prefix.
    pub fn has_vendor_segment(&self) -> bool {
        self.segments().any(|s| s.starts_with("X_"))
    }
}

impl FromStr for ParameterPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Permissive on deserialization: requirement documents carry templates.
        Self::parse_template(s)
    }
}

impl TryFrom<String> for ParameterPath {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ParameterPath> for String {
    fn from(path: ParameterPath) -> String {
        path.0
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ParameterPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_leaf_path() {
        let path = ParameterPath::parse("Device.WiFi.Radio.1.Channel").unwrap();
        assert_eq!(path.name(), "Channel");
        assert!(!path.is_object());
        assert_eq!(path.depth(), 4);
        assert_eq!(path.top_level(), Some("WiFi"));
        assert!(!path.is_custom());
    }

    #[test]
    fn test_valid_object_path() {
        let path = ParameterPath::parse("Device.WiFi.Radio.1.").unwrap();
        assert!(path.is_object());
        assert_eq!(path.name(), "1");
        assert_eq!(path.stem(), "Device.WiFi.Radio.1");
    }

    #[test]
    fn test_root_object() {
        let path = ParameterPath::parse("Device.").unwrap();
        assert!(path.is_object());
        assert_eq!(path.parent(), None);
        assert_eq!(path.depth(), 0);
    }

    #[test]
    fn test_parent_chain() {
        let path = ParameterPath::parse("Device.WiFi.Radio.1.Channel").unwrap();
        let parent = path.parent().unwrap();
        assert_eq!(parent.as_str(), "Device.WiFi.Radio.1.");
        assert!(parent.is_object());
        assert_eq!(parent.parent().unwrap().as_str(), "Device.WiFi.Radio.");
    }

    #[test]
    fn test_rejects_bad_roots() {
        assert_eq!(
            ParameterPath::parse("WiFi.Radio").unwrap_err(),
            PathError::MissingDeviceRoot
        );
        assert_eq!(
            ParameterPath::parse("Device").unwrap_err(),
            PathError::MissingDeviceRoot
        );
        assert_eq!(ParameterPath::parse("").unwrap_err(), PathError::Empty);
    }

    #[test]
    fn test_rejects_empty_segment() {
        assert_eq!(
            ParameterPath::parse("Device..Channel").unwrap_err(),
            PathError::EmptySegment
        );
    }

    #[test]
    fn test_rejects_lowercase_segment() {
        assert!(matches!(
            ParameterPath::parse("Device.wifi.Radio").unwrap_err(),
            PathError::InvalidSegment(s) if s == "wifi"
        ));
    }

    #[test]
    fn test_instance_indices() {
        assert!(ParameterPath::parse("Device.WiFi.Radio.1.SSID").is_ok());
        assert!(ParameterPath::parse("Device.WiFi.Radio.10.SSID").is_ok());
        assert!(matches!(
            ParameterPath::parse("Device.WiFi.Radio.0.SSID").unwrap_err(),
            PathError::InvalidInstanceIndex(_)
        ));
        assert!(matches!(
            ParameterPath::parse("Device.WiFi.Radio.1a.SSID").unwrap_err(),
            PathError::InvalidInstanceIndex(_)
        ));
    }

    #[test]
    fn test_templates_only_in_template_mode() {
        assert_eq!(
            ParameterPath::parse("Device.WiFi.Radio.{i}.Channel").unwrap_err(),
            PathError::TemplateNotAllowed
        );
        let path = ParameterPath::parse_template("Device.WiFi.Radio.{i}.Channel").unwrap();
        assert!(path.is_template());
    }

    #[test]
    fn test_vendor_segments() {
        let path = ParameterPath::parse("Device.X_EXAMPLE-COM_Foo.Bar").unwrap();
        assert!(path.is_custom());
        assert!(path.has_vendor_segment());

        let standard = ParameterPath::parse("Device.WiFi.Radio.1.Channel").unwrap();
        assert!(!standard.has_vendor_segment());
    }

    #[test]
    fn test_unknown_top_level_is_custom() {
        let path = ParameterPath::parse("Device.Frobnicator.Setting").unwrap();
        assert!(path.is_custom());
    }

    #[test]
    fn test_serde_roundtrip() {
        let path = ParameterPath::parse("Device.WiFi.Radio.1.Channel").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"Device.WiFi.Radio.1.Channel\"");
        let parsed: ParameterPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
