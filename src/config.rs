//! Session configuration for transport providers

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CodecError, Result};

/// Default NETCONF port
pub const DEFAULT_PORT: u16 = 830;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Where and how a provider opens a session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Host name or IP address of the target
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect, read and write timeout in milliseconds
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl SessionConfig {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load a session descriptor from the given path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse a session descriptor from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(CodecError::Connection("session address is empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(CodecError::Connection("session timeout must be non-zero".into()));
        }
        Ok(())
    }
}

impl std::str::FromStr for SessionConfig {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: SessionConfig = r#"{"address": "10.0.0.1"}"#.parse().unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_values() {
        let config: SessionConfig = r#"{"address": "router1", "port": 2022, "timeout-ms": 500}"#
            .parse()
            .unwrap();
        assert_eq!(config, SessionConfig::new("router1", 2022).with_timeout(Duration::from_millis(500)));
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(r#"{"address": ""}"#.parse::<SessionConfig>().is_err());
        assert!(r#"{"address": "a", "timeout-ms": 0}"#.parse::<SessionConfig>().is_err());
        assert!(r#"{"address": "a", "user": "admin"}"#.parse::<SessionConfig>().is_err());
    }
}
