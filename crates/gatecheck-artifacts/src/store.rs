// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk artifact tree for tenants and jobs.
//!
//! Layout, per tenant root:
//!
//! ```text
//! {tenant_root}/credentials.json
//! {tenant_root}/emodal/all_containers.xlsx        (master mirror)
//! {tenant_root}/emodal/all_appointments.xlsx      (master mirror)
//! {tenant_root}/emodal/queries/{query_id}/
//!     all_containers.xlsx
//!     filtered_containers.xlsx
//!     all_appointments.xlsx
//!     check_progress.json
//!     containers_checking_attempts/responses/{item}_{epoch}.json
//!     containers_checking_attempts/screenshots/{item}_{epoch}.png
//! ```
//!
//! Every write is atomic: bytes go to a temp file in the destination
//! directory, are fsynced, then renamed over the target. After any write
//! returns, a reader sees either the old content or the new complete
//! content, never a partial file.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use gatecheck_core::{Credentials, GatecheckError};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::progress::CheckProgress;
use crate::xlsx::{self, Table};

/// File name of the raw stage-1 listing.
pub const ALL_CONTAINERS: &str = "all_containers.xlsx";
/// File name of the filtered, progressively enriched table.
pub const FILTERED_CONTAINERS: &str = "filtered_containers.xlsx";
/// File name of the raw stage-5 listing.
pub const ALL_APPOINTMENTS: &str = "all_appointments.xlsx";
/// File name of the stage-4 checkpoint.
pub const CHECK_PROGRESS: &str = "check_progress.json";

const ATTEMPTS_DIR: &str = "containers_checking_attempts";

/// The tenant's platform directory, where master mirrors live.
pub fn platform_dir(tenant_root: &Path) -> PathBuf {
    tenant_root.join("emodal")
}

/// The tenant's per-job directory root.
pub fn queries_dir(tenant_root: &Path) -> PathBuf {
    platform_dir(tenant_root).join("queries")
}

/// Per-item probe response directory of a job.
pub fn responses_dir(job_folder: &Path) -> PathBuf {
    job_folder.join(ATTEMPTS_DIR).join("responses")
}

/// Per-item probe screenshot directory of a job.
pub fn screenshots_dir(job_folder: &Path) -> PathBuf {
    job_folder.join(ATTEMPTS_DIR).join("screenshots")
}

/// Create the job root plus the probe attempt subdirectories.
pub fn ensure_job_dirs(job_folder: &Path) -> Result<(), GatecheckError> {
    fs::create_dir_all(responses_dir(job_folder)).map_err(|e| dir_err(job_folder, e))?;
    fs::create_dir_all(screenshots_dir(job_folder)).map_err(|e| dir_err(job_folder, e))?;
    debug!(folder = %job_folder.display(), "job directories ready");
    Ok(())
}

fn dir_err(path: &Path, e: std::io::Error) -> GatecheckError {
    GatecheckError::Artifact {
        message: format!("failed to create {}", path.display()),
        source: Some(Box::new(e)),
    }
}

/// Atomically replace `path` with `bytes`: temp file in the same
/// directory, fsync, rename.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), GatecheckError> {
    let parent = path.parent().ok_or_else(|| {
        GatecheckError::artifact(format!("{} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(parent).map_err(|e| dir_err(parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    let result = (|| -> std::io::Result<()> {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        // Leave no temp debris behind on failure.
        let _ = fs::remove_file(&tmp_path);
    }
    result.map_err(|e| GatecheckError::Artifact {
        message: format!("atomic write of {} failed", path.display()),
        source: Some(Box::new(e)),
    })
}

/// Atomically write a spreadsheet.
pub fn write_spreadsheet(path: &Path, table: &Table) -> Result<(), GatecheckError> {
    let bytes = xlsx::write_xlsx(table)?;
    write_bytes_atomic(path, &bytes)
}

/// Read a spreadsheet from disk.
pub fn read_spreadsheet(path: &Path) -> Result<Table, GatecheckError> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| GatecheckError::Artifact {
            message: format!("failed to read {}", path.display()),
            source: Some(Box::new(e)),
        })?;
    xlsx::read_xlsx(&bytes)
}

/// Persist a per-item probe response payload.
pub fn write_response(
    job_folder: &Path,
    item_id: &str,
    epoch: i64,
    payload: &serde_json::Value,
) -> Result<PathBuf, GatecheckError> {
    let path = responses_dir(job_folder).join(format!("{item_id}_{epoch}.json"));
    let bytes = serde_json::to_vec_pretty(payload).map_err(|e| GatecheckError::Artifact {
        message: "failed to encode probe response".to_string(),
        source: Some(Box::new(e)),
    })?;
    write_bytes_atomic(&path, &bytes)?;
    Ok(path)
}

/// Persist a per-item probe screenshot.
pub fn write_screenshot(
    job_folder: &Path,
    item_id: &str,
    epoch: i64,
    bytes: &[u8],
) -> Result<PathBuf, GatecheckError> {
    let path = screenshots_dir(job_folder).join(format!("{item_id}_{epoch}.png"));
    write_bytes_atomic(&path, bytes)?;
    Ok(path)
}

/// Atomically replace the stage-4 checkpoint.
pub fn write_progress(job_folder: &Path, progress: &CheckProgress) -> Result<(), GatecheckError> {
    let bytes = serde_json::to_vec_pretty(progress).map_err(|e| GatecheckError::Artifact {
        message: "failed to encode check progress".to_string(),
        source: Some(Box::new(e)),
    })?;
    write_bytes_atomic(&job_folder.join(CHECK_PROGRESS), &bytes)
}

/// Read the stage-4 checkpoint. A missing or corrupt file reads as empty;
/// the run then simply reprocesses from the top.
pub fn read_progress(job_folder: &Path) -> CheckProgress {
    let path = job_folder.join(CHECK_PROGRESS);
    match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "corrupt checkpoint, starting empty");
            CheckProgress::default()
        }),
        Err(_) => CheckProgress::default(),
    }
}

/// Copy a finished job artifact over the tenant's master mirror.
pub fn mirror_to_master(
    job_file: &Path,
    tenant_root: &Path,
    file_name: &str,
) -> Result<(), GatecheckError> {
    let bytes = fs::read(job_file).map_err(|e| GatecheckError::Artifact {
        message: format!("failed to read {}", job_file.display()),
        source: Some(Box::new(e)),
    })?;
    write_bytes_atomic(&platform_dir(tenant_root).join(file_name), &bytes)
}

/// Zip the whole job directory for download. Entries are stored relative
/// to the job root.
pub fn zip_job(job_folder: &Path) -> Result<Vec<u8>, GatecheckError> {
    let mut files = Vec::new();
    collect_files(job_folder, &mut files).map_err(|e| GatecheckError::Artifact {
        message: format!("failed to walk {}", job_folder.display()),
        source: Some(Box::new(e)),
    })?;
    files.sort();

    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for file in files {
        let relative = file
            .strip_prefix(job_folder)
            .map_err(|e| GatecheckError::Artifact {
                message: "job file escaped its folder".to_string(),
                source: Some(Box::new(e)),
            })?;
        let name = relative.to_string_lossy().replace('\\', "/");
        writer
            .start_file(name, options)
            .map_err(|e| zip_err(&file, e))?;
        let bytes = fs::read(&file).map_err(|e| zip_err(&file, e))?;
        writer.write_all(&bytes).map_err(|e| zip_err(&file, e))?;
    }
    let cursor = writer.finish().map_err(|e| zip_err(job_folder, e))?;
    Ok(cursor.into_inner())
}

fn zip_err(path: &Path, e: impl std::error::Error + Send + Sync + 'static) -> GatecheckError {
    GatecheckError::Artifact {
        message: format!("failed to zip {}", path.display()),
        source: Some(Box::new(e)),
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Read the tenant's upstream credentials for a platform from
/// `{tenant_root}/credentials.json`. The file is keyed by platform tag.
pub fn read_credentials(
    tenant_root: &Path,
    platform: &str,
) -> Result<Credentials, GatecheckError> {
    let path = tenant_root.join("credentials.json");
    let bytes = fs::read(&path).map_err(|e| GatecheckError::Artifact {
        message: format!("failed to read credentials at {}", path.display()),
        source: Some(Box::new(e)),
    })?;
    let all: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| GatecheckError::Artifact {
            message: "credentials file is not valid JSON".to_string(),
            source: Some(Box::new(e)),
        })?;
    let entry = all.get(platform).ok_or_else(|| {
        GatecheckError::artifact(format!("no credentials configured for platform {platform}"))
    })?;
    serde_json::from_value(entry.clone()).map_err(|e| GatecheckError::Artifact {
        message: format!("malformed credentials for platform {platform}"),
        source: Some(Box::new(e)),
    })
}
