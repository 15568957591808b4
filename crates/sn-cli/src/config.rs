//! Configuration loading for the Sentinel CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sn_connectors::ConnectorConfig;
use sn_core::{PollerConfig, SyncConfig};
use std::collections::HashMap;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Telemetry API connection.
    #[serde(default)]
    pub api: ApiConfig,

    /// Polling schedule.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Creates a copy with credential-looking header values redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        for (name, value) in config.api.headers.iter_mut() {
            if is_sensitive_header(name) && !value.is_empty() {
                *value = "***REDACTED***".to_string();
            }
        }
        config
    }

    /// Connector settings for the HTTP telemetry source.
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            name: "sentinel-api".to_string(),
            base_url: self.api.base_url.clone(),
            timeout_secs: self.api.timeout_secs,
            verify_tls: self.api.verify_tls,
            headers: self.api.headers.clone(),
        }
    }

    /// Polling schedule for the dashboard.
    pub fn sync_config(&self) -> SyncConfig {
        let polling = &self.polling;
        SyncConfig {
            health: PollerConfig::from_secs(
                polling.health_interval_secs,
                polling.health_timeout_secs,
            ),
            stats: PollerConfig::from_secs(polling.stats_interval_secs, polling.poll_timeout_secs),
            threat_feed: PollerConfig::from_secs(
                polling.feed_interval_secs,
                polling.poll_timeout_secs,
            ),
            threat_map: PollerConfig::from_secs(polling.map_interval_secs, polling.poll_timeout_secs),
            greeting: polling.greeting,
        }
    }
}

fn is_sensitive_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "authorization" || name.contains("token") || name.contains("key")
}

/// Telemetry API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Additional headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    sn_connectors::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    sn_connectors::DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            verify_tls: true,
            headers: HashMap::new(),
        }
    }
}

/// Polling schedule, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,

    #[serde(default = "default_feed_interval")]
    pub feed_interval_secs: u64,

    #[serde(default = "default_map_interval")]
    pub map_interval_secs: u64,

    /// Deadline of each data poll.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Open the analysis log with a greeting.
    #[serde(default = "default_true")]
    pub greeting: bool,
}

fn default_health_interval() -> u64 {
    5
}

fn default_health_timeout() -> u64 {
    3
}

fn default_stats_interval() -> u64 {
    10
}

fn default_feed_interval() -> u64 {
    5
}

fn default_map_interval() -> u64 {
    10
}

fn default_poll_timeout() -> u64 {
    4
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: default_health_interval(),
            health_timeout_secs: default_health_timeout(),
            stats_interval_secs: default_stats_interval(),
            feed_interval_secs: default_feed_interval(),
            map_interval_secs: default_map_interval(),
            poll_timeout_secs: default_poll_timeout(),
            greeting: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}
