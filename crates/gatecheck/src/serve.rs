// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gatecheck serve` command implementation.
//!
//! Wires the whole service together: configuration, SQLite store with
//! startup crash recovery, the upstream client, session manager,
//! pipeline runner, per-tenant scheduler, and the gateway HTTP server.
//! Shuts down gracefully on SIGTERM/SIGINT.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gatecheck_config::{load_config, load_config_from_path, validate_config, GatecheckConfig};
use gatecheck_core::GatecheckError;
use gatecheck_engine::{shutdown, JobLauncher, PipelineRunner, Scheduler, SessionManager};
use gatecheck_gateway::{GatewayState, ServerConfig};
use gatecheck_store::queries::jobs;
use gatecheck_store::Database;
use gatecheck_upstream::UpstreamClient;
use tracing::{info, warn};

fn load(config_path: Option<PathBuf>) -> Result<GatecheckConfig, GatecheckError> {
    let config = match config_path {
        Some(path) => load_config_from_path(&path),
        None => load_config(),
    }
    .map_err(|e| GatecheckError::Config(e.to_string()))?;

    validate_config(&config).map_err(|errors| GatecheckError::Config(errors.join("; ")))?;
    Ok(config)
}

/// Runs the `gatecheck config` command: print the effective merged
/// configuration as TOML-ish JSON for inspection.
pub fn print_config(config_path: Option<PathBuf>) -> Result<(), GatecheckError> {
    let config = load(config_path)?;
    let rendered = serde_json::to_string_pretty(&config)
        .map_err(|e| GatecheckError::Internal(format!("failed to render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Runs the `gatecheck serve` command.
pub async fn run_serve(config_path: Option<PathBuf>) -> Result<(), GatecheckError> {
    let config = load(config_path)?;
    init_tracing(&config.server.log_level);

    info!("starting gatecheck serve");

    // Open the store and recover from any previous crash: jobs left
    // in_progress by a killed process are failed so their tenants are
    // not blocked forever.
    let db = Database::open(&config.storage.database_path).await?;
    let stale = jobs::fail_stale_in_progress(&db).await?;
    if stale > 0 {
        warn!(count = stale, "failed stale in_progress jobs from previous run");
    }

    std::fs::create_dir_all(&config.storage.root).map_err(|e| GatecheckError::Artifact {
        message: format!("failed to create storage root {}", config.storage.root),
        source: Some(Box::new(e)),
    })?;

    // Upstream client with the uniform call timeout.
    let client = Arc::new(UpstreamClient::new(
        config.upstream.base_url.clone(),
        Duration::from_secs(config.upstream.timeout_seconds),
    )?);
    info!(
        base_url = config.upstream.base_url.as_str(),
        timeout_seconds = config.upstream.timeout_seconds,
        "upstream client ready"
    );

    // Engine: sessions, pipeline, launcher, scheduler.
    let sessions = Arc::new(SessionManager::new(
        db.clone(),
        client.clone(),
        config.session.clone(),
    ));
    let runner = Arc::new(PipelineRunner::new(
        db.clone(),
        client.clone(),
        sessions,
        config.pipeline.clone(),
    ));
    let launcher = Arc::new(JobLauncher::new(db.clone(), runner));

    // Install signal handler; everything periodic hangs off this token.
    let cancel = shutdown::install_signal_handler();

    let scheduler = Arc::new(Scheduler::new(
        db.clone(),
        launcher.clone(),
        cancel.clone(),
        config.scheduler.default_frequency_minutes,
    ));
    scheduler.start().await?;

    if config.server.admin_secret.is_none() {
        warn!("no admin secret configured; admin endpoints will reject all requests");
    }

    let state = GatewayState {
        db,
        launcher,
        scheduler,
        admin_secret: config.server.admin_secret.clone(),
        start_time: Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    gatecheck_gateway::start_server(&server_config, state, cancel).await?;

    info!("gatecheck serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gatecheck={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
