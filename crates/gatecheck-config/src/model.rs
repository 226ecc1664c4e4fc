// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Gatecheck service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Gatecheck configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatecheckConfig {
    /// Gateway HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Filesystem and relational storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upstream browser-automation backend settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Session acquisition and recovery settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Pipeline execution settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Gateway HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Secret for admin endpoints. `None` disables the admin surface.
    #[serde(default)]
    pub admin_secret: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_secret: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Filesystem and relational storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for per-tenant artifact trees.
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            database_path: default_database_path(),
        }
    }
}

fn default_storage_root() -> String {
    "storage".to_string()
}

fn default_database_path() -> String {
    "gatecheck.db".to_string()
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the upstream browser-automation API.
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,

    /// Upper bound on every upstream call, in seconds. The upstream
    /// drives a real browser, so slow flows are expected.
    #[serde(default = "default_upstream_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            timeout_seconds: default_upstream_timeout_seconds(),
        }
    }
}

fn default_upstream_base_url() -> String {
    "http://localhost:5010".to_string()
}

fn default_upstream_timeout_seconds() -> u64 {
    2400
}

/// Session acquisition and recovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Total acquisition attempts when the upstream returns 401.
    #[serde(default = "default_acquire_max_retries")]
    pub acquire_max_retries: u32,

    /// Delay between acquisition attempts, in minutes.
    #[serde(default = "default_acquire_retry_minutes")]
    pub acquire_retry_minutes: u64,

    /// Quantum of the cancelable acquisition wait, in seconds. Each
    /// quantum ends with a newer-job check.
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            acquire_max_retries: default_acquire_max_retries(),
            acquire_retry_minutes: default_acquire_retry_minutes(),
            poll_seconds: default_poll_seconds(),
        }
    }
}

fn default_acquire_max_retries() -> u32 {
    3
}

fn default_acquire_retry_minutes() -> u64 {
    10
}

fn default_poll_seconds() -> u64 {
    60
}

/// Pipeline execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Flush the enriched spreadsheet every N processed items.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// Trucking company submitted with every appointment probe.
    #[serde(default = "default_trucking_company")]
    pub trucking_company: String,

    /// Placeholder truck plate submitted with every appointment probe.
    #[serde(default = "default_truck_plate")]
    pub truck_plate: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: default_checkpoint_every(),
            trucking_company: default_trucking_company(),
            truck_plate: default_truck_plate(),
        }
    }
}

fn default_checkpoint_every() -> usize {
    5
}

fn default_trucking_company() -> String {
    "K & R TRANSPORTATION LLC".to_string()
}

fn default_truck_plate() -> String {
    "ABC123".to_string()
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Harvest frequency for tenants without an explicit setting, in minutes.
    #[serde(default = "default_frequency_minutes")]
    pub default_frequency_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_frequency_minutes: default_frequency_minutes(),
        }
    }
}

fn default_frequency_minutes() -> u64 {
    60
}
