// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Artifact download handlers: spreadsheets, job zips, probe responses
//! and screenshots.
//!
//! Every path is derived server-side from tenant and job records; the
//! only client-supplied path component is the per-item artifact filename,
//! which is rejected unless it is a bare file name.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gatecheck_artifacts::{
    platform_dir, responses_dir, screenshots_dir, zip_job, ALL_APPOINTMENTS, ALL_CONTAINERS,
    FILTERED_CONTAINERS,
};
use gatecheck_store::queries::jobs;
use gatecheck_store::{Job, Tenant};
use serde::{Deserialize, Serialize};

use crate::handlers::{error_response, internal_error};
use crate::server::GatewayState;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn serve_file(path: &FsPath, mime: &str, download_name: &str) -> Response {
    match std::fs::read(path) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{download_name}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "File not found"),
    }
}

async fn load_job(
    state: &GatewayState,
    tenant: &Tenant,
    query_id: &str,
) -> Result<Job, Response> {
    match jobs::get_job_for_tenant(&state.db, query_id, tenant.id).await {
        Ok(Some(job)) => Ok(job),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "query not found")),
        Err(e) => Err(internal_error(e)),
    }
}

/// Rejects anything but a bare file name (no separators, no parent refs).
fn safe_file_name(raw: &str) -> Option<&str> {
    if raw.is_empty() || raw.contains('/') || raw.contains('\\') || raw.contains("..") {
        None
    } else {
        Some(raw)
    }
}

/// GET /files/containers: the tenant's latest master container listing.
pub async fn get_latest_containers(Extension(tenant): Extension<Tenant>) -> Response {
    let path = platform_dir(FsPath::new(&tenant.folder_path)).join(ALL_CONTAINERS);
    serve_file(&path, XLSX_MIME, ALL_CONTAINERS)
}

/// GET /files/appointments: the tenant's latest master appointment listing.
pub async fn get_latest_appointments(Extension(tenant): Extension<Tenant>) -> Response {
    let path = platform_dir(FsPath::new(&tenant.folder_path)).join(ALL_APPOINTMENTS);
    serve_file(&path, XLSX_MIME, ALL_APPOINTMENTS)
}

/// GET /files/queries/{query_id}/all-containers
pub async fn get_job_containers(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path(query_id): Path<String>,
) -> Response {
    match load_job(&state, &tenant, &query_id).await {
        Ok(job) => serve_file(
            &FsPath::new(&job.folder_path).join(ALL_CONTAINERS),
            XLSX_MIME,
            &format!("{query_id}_{ALL_CONTAINERS}"),
        ),
        Err(response) => response,
    }
}

/// GET /files/queries/{query_id}/filtered-containers
pub async fn get_job_filtered(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path(query_id): Path<String>,
) -> Response {
    match load_job(&state, &tenant, &query_id).await {
        Ok(job) => serve_file(
            &FsPath::new(&job.folder_path).join(FILTERED_CONTAINERS),
            XLSX_MIME,
            &format!("{query_id}_{FILTERED_CONTAINERS}"),
        ),
        Err(response) => response,
    }
}

/// GET /files/queries/{query_id}/all-appointments
pub async fn get_job_appointments(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path(query_id): Path<String>,
) -> Response {
    match load_job(&state, &tenant, &query_id).await {
        Ok(job) => serve_file(
            &FsPath::new(&job.folder_path).join(ALL_APPOINTMENTS),
            XLSX_MIME,
            &format!("{query_id}_{ALL_APPOINTMENTS}"),
        ),
        Err(response) => response,
    }
}

/// GET /queries/{query_id}/download: the whole job folder as a zip.
pub async fn download_job_zip(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path(query_id): Path<String>,
) -> Response {
    let job = match load_job(&state, &tenant, &query_id).await {
        Ok(job) => job,
        Err(response) => return response,
    };
    let folder = PathBuf::from(&job.folder_path);
    if !folder.exists() {
        return error_response(StatusCode::NOT_FOUND, "Query folder not found");
    }
    // The zip is assembled lazily, per request; nothing is cached on disk.
    match tokio::task::spawn_blocking(move || zip_job(&folder)).await {
        Ok(Ok(bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{query_id}.zip\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => internal_error(e),
        Err(e) => {
            tracing::error!(error = %e, "zip task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "zip failed")
        }
    }
}

/// GET /files/queries/{query_id}/responses/{filename}
pub async fn get_response_file(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path((query_id, filename)): Path<(String, String)>,
) -> Response {
    let Some(filename) = safe_file_name(&filename) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid file name");
    };
    match load_job(&state, &tenant, &query_id).await {
        Ok(job) => serve_file(
            &responses_dir(FsPath::new(&job.folder_path)).join(filename),
            "application/json",
            filename,
        ),
        Err(response) => response,
    }
}

/// GET /files/queries/{query_id}/screenshots/{filename}
pub async fn get_screenshot_file(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path((query_id, filename)): Path<(String, String)>,
) -> Response {
    let Some(filename) = safe_file_name(&filename) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid file name");
    };
    match load_job(&state, &tenant, &query_id).await {
        Ok(job) => serve_file(
            &screenshots_dir(FsPath::new(&job.folder_path)).join(filename),
            "image/png",
            filename,
        ),
        Err(response) => response,
    }
}

/// Query params for GET /files/spreadsheets.
#[derive(Debug, Deserialize)]
pub struct SpreadsheetParams {
    pub kind: String,
    #[serde(default)]
    pub query_id: Option<String>,
}

/// Response body for GET /files/spreadsheets.
#[derive(Debug, Serialize)]
pub struct SpreadsheetMeta {
    pub filename: String,
    pub size: u64,
    pub download_url: String,
}

/// GET /files/spreadsheets?kind=...&query_id=...: metadata plus the
/// download path for one of the known spreadsheet kinds.
pub async fn get_spreadsheet_meta(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Query(params): Query<SpreadsheetParams>,
) -> Response {
    let tenant_root = FsPath::new(&tenant.folder_path);
    let (path, download_url) = match params.kind.as_str() {
        "latest_list" => (
            platform_dir(tenant_root).join(ALL_CONTAINERS),
            "/files/containers".to_string(),
        ),
        "latest_appointments" => (
            platform_dir(tenant_root).join(ALL_APPOINTMENTS),
            "/files/appointments".to_string(),
        ),
        kind @ ("job_list" | "job_filtered" | "job_appointments") => {
            let Some(query_id) = params.query_id.as_deref() else {
                return error_response(StatusCode::BAD_REQUEST, "query_id required for job kinds");
            };
            let job = match load_job(&state, &tenant, query_id).await {
                Ok(job) => job,
                Err(response) => return response,
            };
            let (file, route) = match kind {
                "job_list" => (ALL_CONTAINERS, "all-containers"),
                "job_filtered" => (FILTERED_CONTAINERS, "filtered-containers"),
                _ => (ALL_APPOINTMENTS, "all-appointments"),
            };
            (
                FsPath::new(&job.folder_path).join(file),
                format!("/files/queries/{query_id}/{route}"),
            )
        }
        other => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("unknown spreadsheet kind: {other}"),
            );
        }
    };

    match std::fs::metadata(&path) {
        Ok(meta) => Json(SpreadsheetMeta {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: meta.len(),
            download_url,
        })
        .into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "File not found"),
    }
}
