// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job record operations.
//!
//! Every write is its own short transaction; the pipeline executor never
//! holds a transaction across an upstream call.

use gatecheck_core::{format_query_id, parse_ordinal, GatecheckError, JobStatus, SummaryStats};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Job;

const JOB_COLUMNS: &str = "id, query_id, tenant_id, platform, status, folder_path, \
     summary_stats, error_message, started_at, completed_at";

fn job_from_row(row: &rusqlite::Row<'_>) -> Result<Job, rusqlite::Error> {
    let status_raw: String = row.get(4)?;
    let status = status_raw.parse::<JobStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(Job {
        id: row.get(0)?,
        query_id: row.get(1)?,
        tenant_id: row.get(2)?,
        platform: row.get(3)?,
        status,
        folder_path: row.get(5)?,
        summary_stats: row.get(6)?,
        error_message: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

/// Create a pending job for the tenant.
///
/// The query id embeds a unix-second ordinal assigned monotonically per
/// tenant: the next ordinal is `max(now, newest_existing + 1)`, so two
/// triggers within the same second still produce strictly ordered ids.
/// The job folder lands under `{queries_root}/{query_id}`.
pub async fn create_job(
    db: &Database,
    tenant_id: i64,
    platform: &str,
    queries_root: &str,
) -> Result<Job, GatecheckError> {
    let platform = platform.to_string();
    let queries_root = queries_root.trim_end_matches('/').to_string();
    let now = chrono::Utc::now().timestamp();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let newest: Option<String> = {
                let result = tx.query_row(
                    "SELECT query_id FROM jobs WHERE tenant_id = ?1 ORDER BY id DESC LIMIT 1",
                    params![tenant_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(qid) => Some(qid),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };
            let floor = newest
                .as_deref()
                .and_then(parse_ordinal)
                .map(|o| o + 1)
                .unwrap_or(i64::MIN);
            let ordinal = now.max(floor);

            let query_id = format_query_id(tenant_id, ordinal);
            let folder_path = format!("{queries_root}/{query_id}");
            tx.execute(
                "INSERT INTO jobs (query_id, tenant_id, platform, status, folder_path)
                 VALUES (?1, ?2, ?3, 'pending', ?4)",
                params![query_id, tenant_id, platform, folder_path],
            )?;
            let job = tx.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE query_id = ?1"),
                params![query_id],
                job_from_row,
            )?;
            tx.commit()?;
            Ok(job)
        })
        .await
        .map_err(map_tr_err)
}

/// Try to promote a pending job to in_progress.
///
/// The promotion and the one-in-progress check are a single guarded
/// update, so concurrent workers of the same tenant can never both
/// promote. Returns whether this job now holds the slot.
pub async fn set_in_progress(db: &Database, query_id: &str) -> Result<bool, GatecheckError> {
    let query_id = query_id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE jobs SET status = 'in_progress'
                 WHERE query_id = ?1 AND status = 'pending'
                   AND NOT EXISTS (
                       SELECT 1 FROM jobs AS other
                       WHERE other.tenant_id = jobs.tenant_id
                         AND other.status = 'in_progress'
                   )",
                params![query_id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Write a job's terminal state. Guarded so an already-terminal record is
/// never overwritten.
pub async fn finish(
    db: &Database,
    query_id: &str,
    status: JobStatus,
    stats: Option<&SummaryStats>,
    error_message: Option<&str>,
) -> Result<(), GatecheckError> {
    debug_assert!(status.is_terminal());
    let query_id = query_id.to_string();
    let status = status.to_string();
    let stats_json = match stats {
        Some(s) => Some(serde_json::to_string(s).map_err(|e| GatecheckError::Storage {
            source: Box::new(e),
        })?),
        None => None,
    };
    let error_message = error_message.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = ?1, summary_stats = ?2, error_message = ?3,
                 completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE query_id = ?4 AND status IN ('pending', 'in_progress')",
                params![status, stats_json, error_message, query_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a job by query id.
pub async fn get_job(db: &Database, query_id: &str) -> Result<Option<Job>, GatecheckError> {
    let query_id = query_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE query_id = ?1"),
                params![query_id],
                job_from_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get a job by query id, scoped to a tenant. Used by the gateway so one
/// tenant cannot read another's jobs.
pub async fn get_job_for_tenant(
    db: &Database,
    query_id: &str,
    tenant_id: i64,
) -> Result<Option<Job>, GatecheckError> {
    let job = get_job(db, query_id).await?;
    Ok(job.filter(|j| j.tenant_id == tenant_id))
}

/// List a tenant's jobs, newest first, with an optional status filter and
/// pagination. Returns the page plus the total match count.
pub async fn list_jobs(
    db: &Database,
    tenant_id: i64,
    status: Option<JobStatus>,
    limit: u32,
    offset: u32,
) -> Result<(Vec<Job>, u64), GatecheckError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let (total, jobs) = match &status {
                Some(status_filter) => {
                    let total: u64 = conn.query_row(
                        "SELECT COUNT(*) FROM jobs WHERE tenant_id = ?1 AND status = ?2",
                        params![tenant_id, status_filter],
                        |row| row.get(0),
                    )?;
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {JOB_COLUMNS} FROM jobs
                         WHERE tenant_id = ?1 AND status = ?2
                         ORDER BY id DESC LIMIT ?3 OFFSET ?4"
                    ))?;
                    let rows =
                        stmt.query_map(params![tenant_id, status_filter, limit, offset], job_from_row)?;
                    let mut jobs = Vec::new();
                    for row in rows {
                        jobs.push(row?);
                    }
                    (total, jobs)
                }
                None => {
                    let total: u64 = conn.query_row(
                        "SELECT COUNT(*) FROM jobs WHERE tenant_id = ?1",
                        params![tenant_id],
                        |row| row.get(0),
                    )?;
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {JOB_COLUMNS} FROM jobs
                         WHERE tenant_id = ?1
                         ORDER BY id DESC LIMIT ?2 OFFSET ?3"
                    ))?;
                    let rows = stmt.query_map(params![tenant_id, limit, offset], job_from_row)?;
                    let mut jobs = Vec::new();
                    for row in rows {
                        jobs.push(row?);
                    }
                    (total, jobs)
                }
            };
            Ok((jobs, total))
        })
        .await
        .map_err(map_tr_err)
}

/// True iff any other job for the tenant embeds a strictly greater
/// ordinal. Query ids that fail to parse count as "not newer".
pub async fn find_newer(
    db: &Database,
    tenant_id: i64,
    ordinal: i64,
) -> Result<bool, GatecheckError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT query_id FROM jobs WHERE tenant_id = ?1")?;
            let rows = stmt.query_map(params![tenant_id], |row| row.get::<_, String>(0))?;
            for row in rows {
                if let Some(other) = parse_ordinal(&row?) {
                    if other > ordinal {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        })
        .await
        .map_err(map_tr_err)
}

/// True iff the tenant has an in_progress job other than `excluding`.
pub async fn has_other_in_progress(
    db: &Database,
    tenant_id: i64,
    excluding: Option<&str>,
) -> Result<bool, GatecheckError> {
    let excluding = excluding.map(|s| s.to_string()).unwrap_or_default();
    db.connection()
        .call(move |conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM jobs
                 WHERE tenant_id = ?1 AND status = 'in_progress' AND query_id != ?2",
                params![tenant_id, excluding],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a job row. The caller is responsible for the job folder.
pub async fn delete_job(db: &Database, query_id: &str) -> Result<(), GatecheckError> {
    let query_id = query_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM jobs WHERE query_id = ?1", params![query_id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Startup crash recovery: any job left in_progress by a killed process
/// is marked failed. Returns the number of affected rows.
pub async fn fail_stale_in_progress(db: &Database) -> Result<u64, GatecheckError> {
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE jobs SET status = 'failed',
                 error_message = 'interrupted by restart',
                 completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'in_progress'",
                [],
            )?;
            Ok(affected as u64)
        })
        .await
        .map_err(map_tr_err)
}
