// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Artifact store for the Gatecheck service.
//!
//! Owns the per-tenant/per-job directory tree, atomic idempotent writes of
//! spreadsheets, probe responses, screenshots, and the stage-4 checkpoint,
//! plus lazy zip bundling of job folders. Includes the minimal xlsx codec
//! the pipeline uses for its string tables.

pub mod progress;
pub mod store;
pub mod xlsx;

pub use progress::{CheckProgress, ItemProgress, ItemStatus};
pub use store::{
    ensure_job_dirs, mirror_to_master, platform_dir, queries_dir, read_credentials, read_progress,
    read_spreadsheet, responses_dir, screenshots_dir, write_bytes_atomic, write_progress,
    write_response, write_screenshot, write_spreadsheet, zip_job, ALL_APPOINTMENTS, ALL_CONTAINERS,
    CHECK_PROGRESS, FILTERED_CONTAINERS,
};
pub use xlsx::{read_xlsx, write_xlsx, Table};
