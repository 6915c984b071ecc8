//! Device connection configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tr181_resilience::{ComparatorError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_COUNT: u32 = 3;

/// Credentials for a device endpoint, tagged by scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authentication {
    Basic {
        username: String,
        password: String,
    },
    Digest {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    ApiKey {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<String>,
    },
    Oauth2 {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
    Custom {
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        params: Map<String, Value>,
    },
}

/// Configuration record handed to a hook on connect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    /// Hook type resolved through the registry, e.g. `rest` or `cwmp`
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    pub authentication: Authentication,
    /// Per-operation deadline, serialized as whole seconds
    #[serde(
        default = "default_timeout",
        with = "duration_secs",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: Duration,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Transport-specific settings passed through opaquely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_config: Option<Value>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

fn is_default_timeout(timeout: &Duration) -> bool {
    *timeout == default_timeout()
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl DeviceConfig {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        endpoint: impl Into<String>,
        authentication: Authentication,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            endpoint: endpoint.into(),
            authentication,
            timeout: default_timeout(),
            retry_count: DEFAULT_RETRY_COUNT,
            hook_config: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Reject configurations a factory must not accept.
    pub fn validate(&self) -> Result<()> {
        if self.kind.is_empty() {
            return Err(ComparatorError::configuration("device type cannot be empty"));
        }
        if self.endpoint.is_empty() {
            return Err(ComparatorError::configuration(
                "device endpoint cannot be empty",
            ));
        }
        if self.timeout.is_zero() {
            return Err(ComparatorError::configuration(
                "device timeout must be positive",
            ));
        }
        Ok(())
    }
}
