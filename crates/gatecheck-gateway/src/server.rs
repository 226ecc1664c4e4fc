// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. `/health` is public;
//! tenant routes sit behind bearer auth; `/admin/*` behind the admin
//! secret.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use gatecheck_core::GatecheckError;
use gatecheck_engine::{JobLauncher, Scheduler};
use gatecheck_store::Database;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::auth::{admin_auth_middleware, tenant_auth_middleware};
use crate::files;
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Relational store handle.
    pub db: Database,
    /// Job creation and background dispatch.
    pub launcher: Arc<JobLauncher>,
    /// Per-tenant schedule registry.
    pub scheduler: Arc<Scheduler>,
    /// Secret for the admin surface. `None` rejects all admin requests.
    pub admin_secret: Option<String>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Assembles the full route tree over the given state.
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    let tenant_routes = Router::new()
        .route("/queries/trigger", post(handlers::post_trigger))
        .route("/queries", get(handlers::get_jobs))
        .route(
            "/queries/:query_id",
            get(handlers::get_job).delete(handlers::delete_job),
        )
        .route("/queries/:query_id/download", get(files::download_job_zip))
        .route("/files/containers", get(files::get_latest_containers))
        .route("/files/appointments", get(files::get_latest_appointments))
        .route("/files/spreadsheets", get(files::get_spreadsheet_meta))
        .route(
            "/files/queries/:query_id/all-containers",
            get(files::get_job_containers),
        )
        .route(
            "/files/queries/:query_id/filtered-containers",
            get(files::get_job_filtered),
        )
        .route(
            "/files/queries/:query_id/all-appointments",
            get(files::get_job_appointments),
        )
        .route(
            "/files/queries/:query_id/responses/:filename",
            get(files::get_response_file),
        )
        .route(
            "/files/queries/:query_id/screenshots/:filename",
            get(files::get_screenshot_file),
        )
        .route(
            "/schedule",
            get(handlers::get_schedule).put(handlers::put_schedule),
        )
        .route("/schedule/pause", post(handlers::post_schedule_pause))
        .route("/schedule/resume", post(handlers::post_schedule_resume))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            tenant_auth_middleware,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/tenants", get(handlers::admin_list_tenants))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(tenant_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server; runs until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), GatecheckError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatecheckError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| GatecheckError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
