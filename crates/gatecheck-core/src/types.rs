// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared domain types used across the Gatecheck workspace.

use serde::{Deserialize, Serialize};

/// Lifecycle states of a harvest job.
///
/// Status is monotonic: pending -> in_progress -> {completed | failed}.
/// A job record is never mutated after reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Upstream platforms a job can target. Only E-Modal is implemented; the
/// tag is carried on every job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Emodal,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Emodal => write!(f, "emodal"),
        }
    }
}

/// Direction of a container move, from the listing's "Trade Type" column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    Import,
    Export,
}

impl TradeType {
    /// Parses a raw spreadsheet cell. Anything that is not IMPORT
    /// (case-insensitive) is treated as an export.
    pub fn from_cell(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("IMPORT") {
            TradeType::Import
        } else {
            TradeType::Export
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Import => write!(f, "IMPORT"),
            TradeType::Export => write!(f, "EXPORT"),
        }
    }
}

/// Move type submitted to the upstream appointment probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    PickFull,
    DropFull,
    PickEmpty,
    DropEmpty,
}

impl std::fmt::Display for MoveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveType::PickFull => write!(f, "PICK FULL"),
            MoveType::DropFull => write!(f, "DROP FULL"),
            MoveType::PickEmpty => write!(f, "PICK EMPTY"),
            MoveType::DropEmpty => write!(f, "DROP EMPTY"),
        }
    }
}

/// Aggregate counters recorded on a completed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Rows in the raw stage-1 listing.
    pub totals_list: u64,
    /// Rows surviving the stage-2 filter.
    pub totals_filtered: u64,
    /// Filtered rows with Trade Type IMPORT.
    pub totals_import: u64,
    /// Filtered rows with any other Trade Type.
    pub totals_export: u64,
    /// Stage-4 probes that reached a terminal ok state.
    pub probes_ok: u64,
    /// Stage-4 probes that exhausted their attempts.
    pub probes_failed: u64,
    /// Rows in the raw stage-5 appointments listing.
    pub total_appointments: u64,
    /// Wall-clock duration of the whole run.
    pub duration_seconds: u64,
}

/// Upstream credentials for one tenant, read from the tenant's
/// credential file. Managing that file is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub captcha_api_key: String,
}

/// Formats a query id from its tenant and ordinal parts.
///
/// The embedded unix-second ordinal defines "newer" for the cancellation
/// rule: a job with a strictly greater ordinal supersedes older in-flight
/// jobs of the same tenant.
pub fn format_query_id(tenant_id: i64, ordinal: i64) -> String {
    format!("q_{tenant_id}_{ordinal}")
}

/// Extracts the ordinal embedded in a query id.
///
/// Returns `None` when the id does not match the `q_{tenant}_{ordinal}`
/// shape; callers treat that as "no newer job" rather than erroring.
pub fn parse_ordinal(query_id: &str) -> Option<i64> {
    let rest = query_id.strip_prefix("q_")?;
    let (_, ordinal) = rest.rsplit_once('_')?;
    ordinal.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn job_status_round_trips_through_strings() {
        for status in [
            JobStatus::Pending,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let parsed = JobStatus::from_str(&status.to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(JobStatus::from_str("cancelled").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
    }

    #[test]
    fn trade_type_defaults_to_export() {
        assert_eq!(TradeType::from_cell(" import "), TradeType::Import);
        assert_eq!(TradeType::from_cell("IMPORT"), TradeType::Import);
        assert_eq!(TradeType::from_cell("EXPORT"), TradeType::Export);
        assert_eq!(TradeType::from_cell(""), TradeType::Export);
    }

    #[test]
    fn move_type_strings_match_upstream_vocabulary() {
        assert_eq!(MoveType::PickFull.to_string(), "PICK FULL");
        assert_eq!(MoveType::DropEmpty.to_string(), "DROP EMPTY");
        assert_eq!(MoveType::DropFull.to_string(), "DROP FULL");
    }

    #[test]
    fn query_id_ordinal_round_trip() {
        let id = format_query_id(7, 1_696_789_012);
        assert_eq!(id, "q_7_1696789012");
        assert_eq!(parse_ordinal(&id), Some(1_696_789_012));
    }

    #[test]
    fn malformed_query_ids_have_no_ordinal() {
        assert_eq!(parse_ordinal("garbage"), None);
        assert_eq!(parse_ordinal("q_7"), None);
        assert_eq!(parse_ordinal("q_7_notanumber"), None);
    }

    #[test]
    fn summary_stats_serialize_with_all_keys() {
        let stats = SummaryStats {
            totals_list: 10,
            totals_filtered: 3,
            totals_import: 2,
            totals_export: 1,
            probes_ok: 3,
            probes_failed: 0,
            total_appointments: 4,
            duration_seconds: 120,
        };
        let json = serde_json::to_string(&stats).unwrap();
        for key in [
            "totals_list",
            "totals_filtered",
            "totals_import",
            "totals_export",
            "probes_ok",
            "probes_failed",
            "total_appointments",
            "duration_seconds",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
        let back: SummaryStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
