//! Configuration loading from TOML files
//!
//! Config file is selected via `--config <path>` (default: config/dev.toml).
//! A missing or unparsable file falls back to defaults.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Metrics endpoint returning the JSON envelope
    #[serde(default = "default_endpoint_url")]
    pub url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { url: default_endpoint_url(), timeout_ms: default_timeout_ms() }
    }
}

fn default_endpoint_url() -> String {
    "http://localhost:5001/api/v1/inflation/data".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log file used by the TUI (stdout belongs to the terminal UI)
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { file: default_log_file() }
    }
}

fn default_log_file() -> String {
    "dashboard-tui.log".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    endpoint_url: String,
    endpoint_timeout_ms: u64,
    metrics_interval_secs: u64,
    log_file: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            endpoint_timeout_ms: default_timeout_ms(),
            metrics_interval_secs: default_metrics_interval(),
            log_file: default_log_file(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if toml_config.endpoint.url.trim().is_empty() {
            anyhow::bail!("endpoint.url is empty in {}", path.display());
        }

        Ok(Self {
            endpoint_url: toml_config.endpoint.url,
            endpoint_timeout_ms: toml_config.endpoint.timeout_ms,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            log_file: toml_config.log.file,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn endpoint_timeout_ms(&self) -> u64 {
        self.endpoint_timeout_ms
    }

    pub fn endpoint_timeout(&self) -> Duration {
        Duration::from_millis(self.endpoint_timeout_ms)
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to point at a local endpoint
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    /// Builder method for tests to shorten the request timeout
    pub fn with_endpoint_timeout_ms(mut self, ms: u64) -> Self {
        self.endpoint_timeout_ms = ms;
        self
    }
}
