// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! These types represent the rows stored in the SQLite database.

use gatecheck_core::{parse_ordinal, JobStatus, SummaryStats};

/// A managed tenant with persistent upstream credentials.
#[derive(Debug, Clone)]
pub struct Tenant {
    /// Stable integer identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Opaque bearer token issued at tenant creation.
    pub token: String,
    /// Root of the tenant's on-disk artifact tree.
    pub folder_path: String,
    /// Currently known upstream session, if any. Mutated only by the
    /// session manager.
    pub session_id: Option<String>,
    /// Whether the scheduler runs periodic harvests for this tenant.
    pub schedule_enabled: bool,
    /// Harvest frequency in minutes (>= 1).
    pub schedule_frequency_minutes: i64,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

/// One pipeline run for one tenant on one upstream platform.
#[derive(Debug, Clone)]
pub struct Job {
    /// Auto-increment row id.
    pub id: i64,
    /// `q_{tenant_id}_{unix_seconds}`; the embedded unix-second suffix is
    /// the job ordinal used by the newer-job cancellation rule.
    pub query_id: String,
    /// Owning tenant.
    pub tenant_id: i64,
    /// Upstream platform tag ("emodal").
    pub platform: String,
    /// Lifecycle state. Monotonic; never mutated after a terminal state.
    pub status: JobStatus,
    /// Filesystem directory owned by this job.
    pub folder_path: String,
    /// JSON-encoded [`SummaryStats`], populated on completion.
    pub summary_stats: Option<String>,
    /// Failure description, populated on failure.
    pub error_message: Option<String>,
    /// ISO 8601 creation timestamp.
    pub started_at: String,
    /// ISO 8601 terminal timestamp.
    pub completed_at: Option<String>,
}

impl Job {
    /// The ordinal embedded in this job's query id.
    pub fn ordinal(&self) -> Option<i64> {
        parse_ordinal(&self.query_id)
    }

    /// Decoded summary statistics, when present and well-formed.
    pub fn stats(&self) -> Option<SummaryStats> {
        self.summary_stats
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ordinal_comes_from_query_id() {
        let job = Job {
            id: 1,
            query_id: "q_3_1700000000".to_string(),
            tenant_id: 3,
            platform: "emodal".to_string(),
            status: JobStatus::Pending,
            folder_path: "/tmp/q".to_string(),
            summary_stats: None,
            error_message: None,
            started_at: "2026-01-01T00:00:00.000Z".to_string(),
            completed_at: None,
        };
        assert_eq!(job.ordinal(), Some(1_700_000_000));
        assert!(job.stats().is_none());
    }
}
