//! Connector configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default address of the telemetry API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the HTTP connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name/identifier.
    pub name: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Transport timeout in seconds. Poll deadlines are enforced separately.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Additional headers to include.
    pub headers: HashMap<String, String>,
}

impl ConnectorConfig {
    /// Creates a configuration for the given base URL with default settings.
    pub fn new(name: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            name: "sentinel-api".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_tls: true,
            headers: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_new_overrides_base_url() {
        let config = ConnectorConfig::new("staging", "https://soc.example.com/");
        assert_eq!(config.name, "staging");
        assert_eq!(config.base_url, "https://soc.example.com/");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
