// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the upstream browser-automation API.
//!
//! The upstream speaks JSON over HTTP. Unknown keys in responses are
//! ignored; missing required fields classify as `Permanent` errors at the
//! client layer.

use serde::{Deserialize, Serialize};

/// Response of `POST /get_session`.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquiredSession {
    /// Opaque session token for subsequent authenticated calls.
    pub session_id: String,
    /// Whether the upstream handed back an already-live session.
    #[serde(default)]
    pub reused: bool,
}

/// Response of `POST /list_active_sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveSessions {
    #[serde(default)]
    pub sessions: Vec<String>,
}

/// Response of the listing operations (`/get_containers`, `/get_appointments`).
///
/// The spreadsheet itself is served from `file_url`, an authenticated
/// download against the same session context as the listing call.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub file_url: String,
    /// Row count as reported by the upstream, when it bothers to.
    #[serde(default)]
    pub count: Option<u64>,
}

/// One timeline milestone of an import container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub milestone: String,
    /// `MM/DD/YYYY` or `MM/DD/YYYY HH:MM`; absent or "N/A" when unknown.
    #[serde(default)]
    pub date: Option<String>,
}

/// Per-import-container record from `POST /get_bulk_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportInfo {
    pub item_id: String,
    #[serde(default)]
    pub pregate_passed: bool,
    #[serde(default)]
    pub timeline: Vec<Milestone>,
}

/// Per-export-container record from `POST /get_bulk_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInfo {
    pub item_id: String,
    #[serde(default)]
    pub booking_number: Option<String>,
}

/// Response of `POST /get_bulk_info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkInfo {
    #[serde(default)]
    pub import: Vec<ImportInfo>,
    #[serde(default)]
    pub export: Vec<ExportInfo>,
}

/// Request body of `POST /check_appointments`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRequest {
    pub session_id: String,
    /// "import" or "export"; selects which response shape the upstream returns.
    pub check_type: String,
    pub trucking_company: String,
    pub terminal: String,
    pub move_type: String,
    /// Container number for imports, booking number for exports.
    pub container_id: String,
    pub truck_plate: String,
    pub own_chassis: bool,
}

/// Response of `POST /check_appointments`.
///
/// Imports populate `available_times`; exports populate `calendar_found`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    #[serde(default)]
    pub available_times: Vec<String>,
    #[serde(default)]
    pub calendar_found: Option<bool>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
}

/// A raw download: bytes plus the content type the upstream declared.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
