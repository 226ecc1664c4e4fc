// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Gatecheck configuration system.

use gatecheck_config::{load_config_from_str, validate_config};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_gatecheck_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
admin_secret = "s3cret"
log_level = "debug"

[storage]
root = "/var/lib/gatecheck"
database_path = "/var/lib/gatecheck/gatecheck.db"

[upstream]
base_url = "http://upstream:5010"
timeout_seconds = 1200

[session]
acquire_max_retries = 5
acquire_retry_minutes = 2
poll_seconds = 30

[pipeline]
checkpoint_every = 10
trucking_company = "California Cartage Express"
truck_plate = "XYZ789"

[scheduler]
default_frequency_minutes = 120
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.admin_secret.as_deref(), Some("s3cret"));
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.storage.root, "/var/lib/gatecheck");
    assert_eq!(config.upstream.base_url, "http://upstream:5010");
    assert_eq!(config.upstream.timeout_seconds, 1200);
    assert_eq!(config.session.acquire_max_retries, 5);
    assert_eq!(config.session.acquire_retry_minutes, 2);
    assert_eq!(config.session.poll_seconds, 30);
    assert_eq!(config.pipeline.checkpoint_every, 10);
    assert_eq!(config.pipeline.trucking_company, "California Cartage Express");
    assert_eq!(config.scheduler.default_frequency_minutes, 120);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 5000);
    assert!(config.server.admin_secret.is_none());
    assert_eq!(config.storage.root, "storage");
    assert_eq!(config.upstream.timeout_seconds, 2400);
    assert_eq!(config.session.acquire_max_retries, 3);
    assert_eq!(config.session.acquire_retry_minutes, 10);
    assert_eq!(config.session.poll_seconds, 60);
    assert_eq!(config.pipeline.checkpoint_every, 5);
    assert_eq!(config.pipeline.trucking_company, "K & R TRANSPORTATION LLC");
    assert_eq!(config.pipeline.truck_plate, "ABC123");
    assert_eq!(config.scheduler.default_frequency_minutes, 60);
}

/// Unknown keys are rejected at load time.
#[test]
fn unknown_field_produces_error() {
    let toml = r#"
[upstream]
base_uri = "http://typo:5010"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("base_uri"),
        "error should mention the unknown key, got: {err_str}"
    );
}

/// Defaults pass the semantic validation pass.
#[test]
fn defaults_pass_validation() {
    let config = load_config_from_str("").unwrap();
    assert!(validate_config(&config).is_ok());
}

/// Validation collects every violation rather than failing fast.
#[test]
fn validation_collects_all_violations() {
    let toml = r#"
[upstream]
base_url = ""
timeout_seconds = 0
"#;
    let config = load_config_from_str(toml).unwrap();
    let errors = validate_config(&config).unwrap_err();
    assert!(errors.len() >= 2, "expected both violations, got: {errors:?}");
}
