// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./gatecheck.toml` > `~/.config/gatecheck/gatecheck.toml`
//! > `/etc/gatecheck/gatecheck.toml` with environment variable overrides via
//! `GATECHECK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GatecheckConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/gatecheck/gatecheck.toml` (system-wide)
/// 3. `~/.config/gatecheck/gatecheck.toml` (user XDG config)
/// 4. `./gatecheck.toml` (local directory)
/// 5. `GATECHECK_*` environment variables
pub fn load_config() -> Result<GatecheckConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatecheckConfig::default()))
        .merge(Toml::file("/etc/gatecheck/gatecheck.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("gatecheck/gatecheck.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("gatecheck.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<GatecheckConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatecheckConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GatecheckConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GatecheckConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `GATECHECK_STORAGE_DATABASE_PATH`
/// must map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("GATECHECK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: GATECHECK_UPSTREAM_BASE_URL -> "upstream_base_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("upstream_", "upstream.", 1)
            .replacen("session_", "session.", 1)
            .replacen("pipeline_", "pipeline.", 1)
            .replacen("scheduler_", "scheduler.", 1);
        mapped.into()
    })
}
