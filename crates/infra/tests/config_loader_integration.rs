//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;
use std::time::Duration;

use afasa_domain::ConsoleError;
use afasa_infra::config;
use tempfile::NamedTempFile;

fn write_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

/// Validates a full TOML configuration.
///
/// Assertions:
/// - Every section is read, including per-resource TTL overrides.
/// - Derived durations match the configured seconds.
#[test]
fn test_load_config_from_toml_file() {
    let path = write_config(
        r#"
[api]
base_url = "https://console.example.org/backend"
request_timeout_secs = 8
network_retries = 3
retry_backoff_ms = 100

[oidc]
issuer_url = "https://id.example.org/realms/afasa"
client_id = "afasa-portal"
redirect_uri = "https://console.example.org/callback"
post_logout_redirect_uri = "https://console.example.org/"
refresh_skew_secs = 45

[cache]
default_ttl_secs = 20

[cache.resource_ttl_secs]
audit = 120
me = 600
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("config loads");

    assert_eq!(config.api.request_timeout(), Duration::from_secs(8));
    assert_eq!(config.api.network_retries, 3);
    assert_eq!(config.api.retry_backoff(), Duration::from_millis(100));
    assert_eq!(config.oidc.refresh_skew(), Duration::from_secs(45));
    assert_eq!(config.oidc.post_logout_redirect_uri.as_deref(), Some("https://console.example.org/"));
    assert_eq!(config.cache.ttl_for("me"), Duration::from_secs(600));
    assert_eq!(config.cache.ttl_for("devices"), Duration::from_secs(20));

    std::fs::remove_file(path).ok();
}

/// Validates that loaded files go through validation.
///
/// Assertions:
/// - A syntactically valid file with a non-http issuer is rejected as a
///   configuration error naming the field.
#[test]
fn test_invalid_file_values_are_rejected() {
    let path = write_config(
        r#"{
            "api": { "base_url": "http://localhost:8000" },
            "oidc": {
                "issuer_url": "ldap://id.example.org",
                "client_id": "afasa-portal",
                "redirect_uri": "http://localhost:3000/callback"
            }
        }"#,
        "json",
    );

    let err = config::load_from_file(Some(path.clone())).unwrap_err();

    assert!(matches!(&err, ConsoleError::Config(msg) if msg.contains("oidc.issuer_url")));
    std::fs::remove_file(path).ok();
}

#[test]
fn test_malformed_toml_is_config_error() {
    let path = write_config("[api\nbase_url = ", "toml");

    let err = config::load_from_file(Some(path.clone())).unwrap_err();

    assert!(matches!(&err, ConsoleError::Config(msg) if msg.starts_with("Invalid TOML")));
    std::fs::remove_file(path).ok();
}
