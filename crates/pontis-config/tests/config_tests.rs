// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Pontis configuration system.

use pontis_config::{load_config_from_str, validate_config};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_pontis_config() {
    let toml = r#"
[bridge]
name = "test-bridge"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9090
public_url = "https://bridge.example.com"

[webhook]
app_secret = "shh"
verify_signatures = true

[runtime]
base_url = "https://runtime.example.com"
api_key = "vf-key"
timeout_secs = 20

[graph]
base_url = "https://graph.example.com/v18.0"
client_id = "app-1"
client_secret = "app-secret"
send_timeout_secs = 8

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[queue]
batch_size = 10
max_retries = 5
stale_after_secs = 120
drain_interval_secs = 15

[session]
ttl_days = 30
history_limit = 20
cleanup_interval_hours = 12

[refresh]
interval_hours = 6
threshold_days = 10
fallback_ttl_days = 45
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bridge.name, "test-bridge");
    assert_eq!(config.bridge.log_level, "debug");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.public_url, "https://bridge.example.com");
    assert_eq!(config.webhook.app_secret.as_deref(), Some("shh"));
    assert_eq!(config.runtime.base_url, "https://runtime.example.com");
    assert_eq!(config.runtime.api_key.as_deref(), Some("vf-key"));
    assert_eq!(config.runtime.timeout_secs, 20);
    assert_eq!(config.graph.client_id.as_deref(), Some("app-1"));
    assert_eq!(config.graph.send_timeout_secs, 8);
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.queue.batch_size, 10);
    assert_eq!(config.queue.max_retries, 5);
    assert_eq!(config.session.ttl_days, 30);
    assert_eq!(config.session.history_limit, 20);
    assert_eq!(config.refresh.threshold_days, 10);
    assert!(validate_config(&config).is_ok());
}

/// Unknown field in a section is rejected.
#[test]
fn unknown_field_produces_error() {
    let toml = r#"
[webhook]
app_secrt = "typo"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("app_secrt"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.bridge.name, "pontis");
    assert_eq!(config.bridge.log_level, "info");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.webhook.app_secret.is_none());
    assert!(config.webhook.verify_signatures);
    assert!(config.runtime.api_key.is_none());
    assert_eq!(config.runtime.timeout_secs, 15);
    assert_eq!(config.graph.base_url, "https://graph.facebook.com/v18.0");
    assert_eq!(config.graph.send_timeout_secs, 10);
    assert_eq!(config.storage.database_path, "pontis.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.queue.batch_size, 5);
    assert_eq!(config.queue.max_retries, 3);
    assert_eq!(config.queue.stale_after_secs, 300);
    assert_eq!(config.session.ttl_days, 365);
    assert_eq!(config.session.history_limit, 50);
    assert_eq!(config.refresh.interval_hours, 24);
    assert_eq!(config.refresh.threshold_days, 7);
    assert_eq!(config.refresh.fallback_ttl_days, 60);
}

/// Partial sections keep defaults for unspecified keys.
#[test]
fn partial_section_keeps_defaults() {
    let toml = r#"
[queue]
batch_size = 2
"#;
    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.queue.batch_size, 2);
    assert_eq!(config.queue.max_retries, 3);
    assert_eq!(config.queue.drain_interval_secs, 30);
}
