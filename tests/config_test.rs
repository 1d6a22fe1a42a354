//! Integration tests for configuration loading

use inflation_dashboard::infra::Config;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[endpoint]
url = "http://metrics.internal:8080/api/v1/inflation/data"
timeout_ms = 2500

[metrics]
interval_secs = 15

[log]
file = "/tmp/dashboard-test.log"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.endpoint_url(), "http://metrics.internal:8080/api/v1/inflation/data");
    assert_eq!(config.endpoint_timeout_ms(), 2500);
    assert_eq!(config.endpoint_timeout(), Duration::from_millis(2500));
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.log_file(), "/tmp/dashboard-test.log");
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[endpoint]\ntimeout_ms = 500\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.endpoint_url(), "http://localhost:5001/api/v1/inflation/data");
    assert_eq!(config.endpoint_timeout_ms(), 500);
    assert_eq!(config.metrics_interval_secs(), 60);
    assert_eq!(config.log_file(), "dashboard-tui.log");
}

#[test]
fn test_empty_url_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[endpoint]\nurl = \"  \"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_invalid_toml_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[endpoint\nurl = ").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.endpoint_url(), "http://localhost:5001/api/v1/inflation/data");
    assert_eq!(config.endpoint_timeout_ms(), 10000);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_dev_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/dev.toml");
    let config = Config::from_file(path).unwrap();
    assert_eq!(config.endpoint_url(), "http://localhost:5001/api/v1/inflation/data");
    assert_eq!(config.metrics_interval_secs(), 60);
}
