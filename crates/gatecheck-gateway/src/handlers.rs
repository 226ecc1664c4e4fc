// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for job and schedule operations.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatecheck_core::{GatecheckError, JobStatus, Platform};
use gatecheck_store::queries::{jobs, tenants};
use gatecheck_store::{Job, Tenant};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub(crate) fn internal_error(e: GatecheckError) -> Response {
    tracing::error!(error = %e, "request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// JSON view of a job record.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub query_id: String,
    pub platform: String,
    pub status: String,
    pub summary_stats: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            query_id: job.query_id.clone(),
            platform: job.platform.clone(),
            status: job.status.to_string(),
            summary_stats: job
                .summary_stats
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok()),
            error_message: job.error_message.clone(),
            started_at: job.started_at.clone(),
            completed_at: job.completed_at.clone(),
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub scheduled_tenants: usize,
}

/// GET /health (unauthenticated; for process supervisors).
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        scheduled_tenants: state.scheduler.armed_count(),
    })
}

/// Response body for POST /queries/trigger.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub query_id: String,
    pub status: String,
    pub message: String,
}

/// POST /queries/trigger
///
/// Creates a pending job, spawns the pipeline in the background, and
/// returns immediately.
pub async fn post_trigger(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
) -> Response {
    match state.launcher.trigger(&tenant, Platform::Emodal).await {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(TriggerResponse {
                success: true,
                query_id: job.query_id,
                status: job.status.to_string(),
                message: "Query started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// Query params for GET /queries.
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Response body for GET /queries.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub success: bool,
    pub queries: Vec<JobView>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// GET /queries: list the tenant's jobs with status filter and pagination.
pub async fn get_jobs(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Query(params): Query<ListJobsParams>,
) -> Response {
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<JobStatus>() {
            Ok(status) => Some(status),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        },
    };
    let limit = params.limit.unwrap_or(50).min(500);
    let offset = params.offset.unwrap_or(0);

    match jobs::list_jobs(&state.db, tenant.id, status, limit, offset).await {
        Ok((page, total)) => Json(JobListResponse {
            success: true,
            queries: page.iter().map(JobView::from).collect(),
            total,
            limit,
            offset,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /queries/{query_id}: detailed job information.
pub async fn get_job(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path(query_id): Path<String>,
) -> Response {
    match jobs::get_job_for_tenant(&state.db, &query_id, tenant.id).await {
        Ok(Some(job)) => Json(serde_json::json!({
            "success": true,
            "query": JobView::from(&job),
        }))
        .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "query not found"),
        Err(e) => internal_error(e),
    }
}

/// DELETE /queries/{query_id}: remove the job record and its folder.
pub async fn delete_job(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Path(query_id): Path<String>,
) -> Response {
    let job = match jobs::get_job_for_tenant(&state.db, &query_id, tenant.id).await {
        Ok(Some(job)) => job,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "query not found"),
        Err(e) => return internal_error(e),
    };

    if std::path::Path::new(&job.folder_path).exists() {
        if let Err(e) = std::fs::remove_dir_all(&job.folder_path) {
            tracing::warn!(query_id = %query_id, error = %e, "failed to remove job folder");
        }
    }
    match jobs::delete_job(&state.db, &query_id).await {
        Ok(()) => Json(serde_json::json!({"success": true, "message": "Query deleted"}))
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// Schedule settings body, shared by GET and PUT /schedule.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub enabled: bool,
    pub frequency: i64,
}

/// GET /schedule: the tenant's schedule settings.
pub async fn get_schedule(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
) -> Response {
    match tenants::get_tenant(&state.db, tenant.id).await {
        Ok(Some(tenant)) => Json(serde_json::json!({
            "success": true,
            "schedule": ScheduleView {
                enabled: tenant.schedule_enabled,
                frequency: tenant.schedule_frequency_minutes,
            },
        }))
        .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "tenant not found"),
        Err(e) => internal_error(e),
    }
}

/// Request body for PUT /schedule.
#[derive(Debug, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub frequency: Option<i64>,
}

/// PUT /schedule: update enabled flag and/or frequency, rescheduling
/// the tenant's tick task accordingly.
pub async fn put_schedule(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
    Json(body): Json<ScheduleUpdate>,
) -> Response {
    if let Some(frequency) = body.frequency {
        if frequency < 1 {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Frequency must be at least 1 minute",
            );
        }
        if let Err(e) = state.scheduler.update_frequency(tenant.id, frequency).await {
            return internal_error(e);
        }
    }
    if let Some(enabled) = body.enabled {
        let result = if enabled {
            state.scheduler.resume(tenant.id).await
        } else {
            state.scheduler.pause(tenant.id).await
        };
        if let Err(e) = result {
            return internal_error(e);
        }
    }
    get_schedule(State(state), Extension(tenant)).await
}

/// POST /schedule/pause: disable automated harvests.
pub async fn post_schedule_pause(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
) -> Response {
    match state.scheduler.pause(tenant.id).await {
        Ok(()) => Json(serde_json::json!({"success": true, "message": "Schedule paused"}))
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /schedule/resume: re-enable automated harvests.
pub async fn post_schedule_resume(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<Tenant>,
) -> Response {
    match state.scheduler.resume(tenant.id).await {
        Ok(()) => Json(serde_json::json!({"success": true, "message": "Schedule resumed"}))
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// Admin view of a tenant row. Tokens and session ids stay private.
#[derive(Debug, Serialize)]
pub struct TenantView {
    pub id: i64,
    pub name: String,
    pub schedule_enabled: bool,
    pub schedule_frequency_minutes: i64,
    pub has_session: bool,
    pub created_at: String,
}

/// GET /admin/tenants: list all tenants (admin secret required).
pub async fn admin_list_tenants(State(state): State<GatewayState>) -> Response {
    match tenants::list_tenants(&state.db).await {
        Ok(all) => Json(serde_json::json!({
            "success": true,
            "tenants": all
                .iter()
                .map(|t| TenantView {
                    id: t.id,
                    name: t.name.clone(),
                    schedule_enabled: t.schedule_enabled,
                    schedule_frequency_minutes: t.schedule_frequency_minutes,
                    has_session: t.session_id.is_some(),
                    created_at: t.created_at.clone(),
                })
                .collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job {
            id: 1,
            query_id: "q_1_1700000000".to_string(),
            tenant_id: 1,
            platform: "emodal".to_string(),
            status: JobStatus::Completed,
            folder_path: "/tmp/q".to_string(),
            summary_stats: Some(r#"{"totals_list": 10, "probes_ok": 3}"#.to_string()),
            error_message: None,
            started_at: "2026-01-01T00:00:00.000Z".to_string(),
            completed_at: Some("2026-01-01T00:10:00.000Z".to_string()),
        }
    }

    #[test]
    fn job_view_decodes_summary_stats() {
        let view = JobView::from(&job());
        assert_eq!(view.status, "completed");
        let stats = view.summary_stats.unwrap();
        assert_eq!(stats["totals_list"], 10);
        assert_eq!(stats["probes_ok"], 3);
    }

    #[test]
    fn job_view_tolerates_malformed_stats() {
        let mut broken = job();
        broken.summary_stats = Some("{oops".to_string());
        let view = JobView::from(&broken);
        assert!(view.summary_stats.is_none());
    }

    #[test]
    fn list_params_deserialize_with_defaults() {
        let params: ListJobsParams = serde_json::from_str("{}").unwrap();
        assert!(params.status.is_none());
        assert!(params.limit.is_none());

        let params: ListJobsParams =
            serde_json::from_str(r#"{"status": "failed", "limit": 5, "offset": 10}"#).unwrap();
        assert_eq!(params.status.as_deref(), Some("failed"));
        assert_eq!(params.limit, Some(5));
        assert_eq!(params.offset, Some(10));
    }

    #[test]
    fn error_response_serializes() {
        let body = serde_json::to_string(&ErrorResponse {
            error: "query not found".to_string(),
        })
        .unwrap();
        assert!(body.contains("query not found"));
    }
}
