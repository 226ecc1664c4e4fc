// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all violations instead of failing fast.

use crate::model::GatecheckConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err` with all collected
/// violation messages.
pub fn validate_config(config: &GatecheckConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }

    if config.storage.root.trim().is_empty() {
        errors.push("storage.root must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push("storage.database_path must not be empty".to_string());
    }

    if config.upstream.base_url.trim().is_empty() {
        errors.push("upstream.base_url must not be empty".to_string());
    }

    if config.upstream.timeout_seconds == 0 {
        errors.push("upstream.timeout_seconds must be at least 1".to_string());
    }

    if config.session.acquire_max_retries == 0 {
        errors.push("session.acquire_max_retries must be at least 1".to_string());
    }

    if config.session.poll_seconds == 0 {
        errors.push("session.poll_seconds must be at least 1".to_string());
    }

    if config.pipeline.checkpoint_every == 0 {
        errors.push("pipeline.checkpoint_every must be at least 1".to_string());
    }

    if config.scheduler.default_frequency_minutes == 0 {
        errors.push("scheduler.default_frequency_minutes must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GatecheckConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_frequency_fails_validation() {
        let mut config = GatecheckConfig::default();
        config.scheduler.default_frequency_minutes = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("default_frequency_minutes")));
    }

    #[test]
    fn empty_storage_root_fails_validation() {
        let mut config = GatecheckConfig::default();
        config.storage.root = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("storage.root")));
    }

    #[test]
    fn zero_checkpoint_interval_fails_validation() {
        let mut config = GatecheckConfig::default();
        config.pipeline.checkpoint_every = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("checkpoint_every")));
    }
}
