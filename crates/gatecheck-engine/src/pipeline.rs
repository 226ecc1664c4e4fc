// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The five-stage harvest pipeline.
//!
//! One [`PipelineRunner::run`] call executes a whole job on its own
//! worker: list -> filter -> bulk enrich -> per-item probe -> appointment
//! list. Stages run strictly in order; within stage 4 items are probed
//! sequentially because the upstream is a shared browser-backed service
//! that does not tolerate intra-job parallel probes.
//!
//! Retry policy: a listing or bulk call gets one retry, with session
//! recovery when the failure classified as `SessionInvalid`. A probe gets
//! one retry per item; per-item failures are recorded in the checkpoint
//! and do not fail the job. Between items (and inside recovery waits) the
//! runner polls for a newer job of the same tenant and terminates with
//! the cancellation reason when one exists.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gatecheck_artifacts::{
    ensure_job_dirs, mirror_to_master, read_progress, read_xlsx, write_bytes_atomic,
    write_progress, write_response, write_screenshot, write_spreadsheet, ItemStatus, Table,
    ALL_APPOINTMENTS, ALL_CONTAINERS, FILTERED_CONTAINERS,
};
use gatecheck_config::model::PipelineConfig;
use gatecheck_core::{GatecheckError, JobStatus, MoveType, SummaryStats, TradeType, UpstreamError};
use gatecheck_store::queries::jobs;
use gatecheck_store::{Database, Job, Tenant};
use gatecheck_upstream::{Listing, ProbeOutcome, UpstreamClient};
use tracing::{debug, error, info, warn};

use crate::filter::{
    filter_listing, COL_CONTAINER, COL_CURRENT_LOC, COL_DESTINATION, COL_FIRST_APPT_AFTER,
    COL_FIRST_APPT_BEFORE, COL_ORIGIN, COL_TRADE_TYPE, COL_DEPARTED, COL_EMPTY_RECEIVED,
    COL_MANIFESTED,
};
use crate::session::SessionManager;
use crate::terminal::determine_terminal;
use crate::timeline::{extract_milestone_date, find_earliest_appointment};

/// Poll interval while waiting for an older in_progress job to clear.
const TURN_POLL: Duration = Duration::from_secs(2);

/// Which spreadsheet a listing stage fetches.
#[derive(Debug, Clone, Copy)]
enum ListingKind {
    Containers,
    Appointments,
}

/// Executes harvest jobs end to end and records their terminal state.
pub struct PipelineRunner {
    db: Database,
    client: Arc<UpstreamClient>,
    sessions: Arc<SessionManager>,
    config: PipelineConfig,
}

impl PipelineRunner {
    /// Creates a runner over the shared store, client, and session manager.
    pub fn new(
        db: Database,
        client: Arc<UpstreamClient>,
        sessions: Arc<SessionManager>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            db,
            client,
            sessions,
            config,
        }
    }

    /// Runs the job to a terminal state. Never panics the worker; every
    /// outcome lands in the job record.
    pub async fn run(&self, tenant: &Tenant, job: &Job) {
        info!(query_id = %job.query_id, tenant_id = tenant.id, "pipeline run starting");
        let started = Instant::now();

        let finish_result = match self.execute(tenant, job, started).await {
            Ok(stats) => {
                info!(
                    query_id = %job.query_id,
                    probes_ok = stats.probes_ok,
                    probes_failed = stats.probes_failed,
                    duration_seconds = stats.duration_seconds,
                    "pipeline run completed"
                );
                jobs::finish(&self.db, &job.query_id, JobStatus::Completed, Some(&stats), None).await
            }
            Err(GatecheckError::CancelledByNewerJob) => {
                info!(query_id = %job.query_id, "pipeline run cancelled by newer job");
                jobs::finish(
                    &self.db,
                    &job.query_id,
                    JobStatus::Failed,
                    None,
                    Some("cancelled by newer job"),
                )
                .await
            }
            Err(e) => {
                error!(query_id = %job.query_id, error = %e, "pipeline run failed");
                jobs::finish(
                    &self.db,
                    &job.query_id,
                    JobStatus::Failed,
                    None,
                    Some(&e.to_string()),
                )
                .await
            }
        };

        if let Err(e) = finish_result {
            error!(query_id = %job.query_id, error = %e, "failed to record job terminal state");
        }
    }

    async fn execute(
        &self,
        tenant: &Tenant,
        job: &Job,
        started: Instant,
    ) -> Result<SummaryStats, GatecheckError> {
        let ordinal = job.ordinal();
        self.claim_in_progress(tenant.id, job).await?;

        let job_folder = Path::new(&job.folder_path);
        let tenant_root = Path::new(&tenant.folder_path);
        ensure_job_dirs(job_folder)?;

        let mut stats = SummaryStats::default();

        // Stage 1: raw container listing.
        let listing_bytes = self
            .fetch_listing(tenant, ordinal, ListingKind::Containers)
            .await?;
        let containers_path = job_folder.join(ALL_CONTAINERS);
        write_bytes_atomic(&containers_path, &listing_bytes)?;
        mirror_to_master(&containers_path, tenant_root, ALL_CONTAINERS)?;
        let listing = read_xlsx(&listing_bytes)?;
        stats.totals_list = listing.rows.len() as u64;
        debug!(query_id = %job.query_id, rows = stats.totals_list, "stage 1 listing written");

        // Stage 2: filter and append the output columns.
        let mut filtered = filter_listing(&listing);
        stats.totals_filtered = filtered.rows.len() as u64;
        let filtered_path = job_folder.join(FILTERED_CONTAINERS);
        write_spreadsheet(&filtered_path, &filtered)?;
        debug!(query_id = %job.query_id, rows = stats.totals_filtered, "stage 2 filter written");

        // Stage 3: one bulk enrichment call for all filtered ids.
        let enrichment = self
            .bulk_enrich(tenant, ordinal, &mut filtered, &mut stats)
            .await?;
        write_spreadsheet(&filtered_path, &filtered)?;

        // Stage 4: per-item appointment probes.
        self.probe_items(tenant, job, &mut filtered, &enrichment, &mut stats)
            .await?;

        // Stage 5: raw appointment listing.
        let appointments_bytes = self
            .fetch_listing(tenant, ordinal, ListingKind::Appointments)
            .await?;
        let appointments_path = job_folder.join(ALL_APPOINTMENTS);
        write_bytes_atomic(&appointments_path, &appointments_bytes)?;
        mirror_to_master(&appointments_path, tenant_root, ALL_APPOINTMENTS)?;
        stats.total_appointments = read_xlsx(&appointments_bytes)?.rows.len() as u64;

        stats.duration_seconds = started.elapsed().as_secs();
        Ok(stats)
    }

    /// Blocks until this job holds the tenant's single in_progress slot.
    /// The promotion is a guarded update, so two workers of the same
    /// tenant can never both promote. A newer job appearing while we
    /// wait supersedes us.
    async fn claim_in_progress(&self, tenant_id: i64, job: &Job) -> Result<(), GatecheckError> {
        loop {
            if jobs::set_in_progress(&self.db, &job.query_id).await? {
                return Ok(());
            }
            if let Some(ordinal) = job.ordinal() {
                if jobs::find_newer(&self.db, tenant_id, ordinal).await? {
                    return Err(GatecheckError::CancelledByNewerJob);
                }
            }
            debug!(query_id = %job.query_id, "waiting for older job to finish");
            tokio::time::sleep(TURN_POLL).await;
        }
    }

    async fn list_call(
        &self,
        kind: ListingKind,
        session: &str,
    ) -> Result<Listing, UpstreamError> {
        match kind {
            ListingKind::Containers => self.client.list_items(session).await,
            ListingKind::Appointments => self.client.list_appointments(session).await,
        }
    }

    /// Listing stage body: one call, one retry with a fresh session on
    /// session invalidation or a transient fault, then the authenticated
    /// spreadsheet download.
    async fn fetch_listing(
        &self,
        tenant: &Tenant,
        ordinal: Option<i64>,
        kind: ListingKind,
    ) -> Result<Vec<u8>, GatecheckError> {
        let session = self.sessions.ensure(tenant, ordinal).await?;
        let listing = match self.list_call(kind, &session).await {
            Ok(listing) => listing,
            Err(e) if e.is_session_invalid() || e.is_transient() => {
                warn!(error = %e, "listing failed, retrying with fresh session");
                let session = self.sessions.recover(tenant, ordinal).await?;
                self.list_call(kind, &session).await?
            }
            Err(e) => return Err(e.into()),
        };
        let download = self.client.download(&listing.file_url).await?;
        Ok(download.bytes)
    }

    /// Stage 3: partition the filtered rows by trade direction, call the
    /// bulk endpoint once, and fold import timelines into the three
    /// timeline columns. Export rows keep all five output columns as
    /// "N/A" permanently; their booking numbers feed stage 4.
    async fn bulk_enrich(
        &self,
        tenant: &Tenant,
        ordinal: Option<i64>,
        filtered: &mut Table,
        stats: &mut SummaryStats,
    ) -> Result<Enrichment, GatecheckError> {
        let mut import_ids = Vec::new();
        let mut export_ids = Vec::new();
        for row_idx in 0..filtered.rows.len() {
            let item_id = filtered
                .cell(row_idx, COL_CONTAINER)
                .unwrap_or("")
                .trim()
                .to_string();
            if item_id.is_empty() {
                continue;
            }
            match TradeType::from_cell(filtered.cell(row_idx, COL_TRADE_TYPE).unwrap_or("")) {
                TradeType::Import => import_ids.push(item_id),
                TradeType::Export => export_ids.push(item_id),
            }
        }
        stats.totals_import = import_ids.len() as u64;
        stats.totals_export = export_ids.len() as u64;

        let mut enrichment = Enrichment::default();
        if import_ids.is_empty() && export_ids.is_empty() {
            return Ok(enrichment);
        }

        let session = self.sessions.ensure(tenant, ordinal).await?;
        let bulk = match self
            .client
            .get_bulk_info(&session, &import_ids, &export_ids)
            .await
        {
            Ok(bulk) => bulk,
            Err(e) if e.is_session_invalid() => {
                warn!(error = %e, "bulk enrichment hit invalid session, recovering");
                let session = self.sessions.recover(tenant, ordinal).await?;
                self.client
                    .get_bulk_info(&session, &import_ids, &export_ids)
                    .await?
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "bulk enrichment transient failure, retrying");
                self.client
                    .get_bulk_info(&session, &import_ids, &export_ids)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };

        for info in bulk.import {
            enrichment
                .pregate_passed
                .insert(info.item_id.clone(), info.pregate_passed);
            enrichment.timelines.insert(info.item_id, info.timeline);
        }
        for info in bulk.export {
            if let Some(booking) = info.booking_number {
                enrichment.bookings.insert(info.item_id, booking);
            }
        }

        for row_idx in 0..filtered.rows.len() {
            let item_id = filtered
                .cell(row_idx, COL_CONTAINER)
                .unwrap_or("")
                .trim()
                .to_string();
            let trade = TradeType::from_cell(filtered.cell(row_idx, COL_TRADE_TYPE).unwrap_or(""));
            if trade != TradeType::Import {
                continue;
            }
            let Some(timeline) = enrichment.timelines.get(&item_id) else {
                continue;
            };
            for (column, milestone) in [
                (COL_MANIFESTED, "Manifested"),
                (COL_DEPARTED, "Departed Terminal"),
                (COL_EMPTY_RECEIVED, "Empty Received"),
            ] {
                if let Some(date) = extract_milestone_date(timeline, milestone) {
                    filtered.set_cell(row_idx, column, &date);
                }
            }
        }
        Ok(enrichment)
    }

    /// Stage 4: probe every filtered row in row order, checkpointing each
    /// item and flushing the spreadsheet every `checkpoint_every` items.
    async fn probe_items(
        &self,
        tenant: &Tenant,
        job: &Job,
        filtered: &mut Table,
        enrichment: &Enrichment,
        stats: &mut SummaryStats,
    ) -> Result<(), GatecheckError> {
        let job_folder = Path::new(&job.folder_path);
        let filtered_path = job_folder.join(FILTERED_CONTAINERS);
        let ordinal = job.ordinal();
        let mut progress = read_progress(job_folder);
        let mut processed = 0usize;

        for row_idx in 0..filtered.rows.len() {
            // Cancellation observation point between items.
            if let Some(ordinal) = ordinal {
                if jobs::find_newer(&self.db, tenant.id, ordinal).await? {
                    return Err(GatecheckError::CancelledByNewerJob);
                }
            }

            let item_id = filtered
                .cell(row_idx, COL_CONTAINER)
                .unwrap_or("")
                .trim()
                .to_string();
            if item_id.is_empty() {
                continue;
            }
            if progress.is_done_ok(&item_id) {
                debug!(item_id = %item_id, "item already probed, skipping");
                continue;
            }

            let trade = TradeType::from_cell(filtered.cell(row_idx, COL_TRADE_TYPE).unwrap_or(""));
            let terminal = determine_terminal(
                trade,
                filtered.cell(row_idx, COL_CURRENT_LOC).unwrap_or(""),
                filtered.cell(row_idx, COL_ORIGIN).unwrap_or(""),
                filtered.cell(row_idx, COL_DESTINATION).unwrap_or(""),
            );
            let move_type = match trade {
                TradeType::Import => {
                    if enrichment
                        .pregate_passed
                        .get(&item_id)
                        .copied()
                        .unwrap_or(false)
                    {
                        MoveType::DropEmpty
                    } else {
                        MoveType::PickFull
                    }
                }
                TradeType::Export => MoveType::DropFull,
            };
            let epoch = chrono::Utc::now().timestamp();

            let identifier = match trade {
                TradeType::Import => item_id.clone(),
                TradeType::Export => match enrichment.bookings.get(&item_id) {
                    Some(booking) => booking.clone(),
                    None => {
                        warn!(item_id = %item_id, "export item has no booking number");
                        progress.record(&item_id, ItemStatus::Failed, epoch);
                        write_progress(job_folder, &progress)?;
                        stats.probes_failed += 1;
                        processed += 1;
                        if processed % self.config.checkpoint_every == 0 {
                            write_spreadsheet(&filtered_path, filtered)?;
                        }
                        continue;
                    }
                },
            };

            info!(
                item_id = %item_id,
                trade = %trade,
                terminal = %terminal,
                move_type = %move_type,
                "probing appointment availability"
            );

            match self
                .probe_with_retry(tenant, ordinal, trade, &terminal, move_type, &identifier)
                .await
            {
                Ok(outcome) => {
                    self.persist_probe_artifacts(
                        job_folder, &item_id, epoch, trade, &terminal, move_type, &identifier,
                        &outcome,
                    )
                    .await?;
                    match trade {
                        TradeType::Import => {
                            if let Some(date) = find_earliest_appointment(&outcome.available_times)
                            {
                                let column = match move_type {
                                    MoveType::PickFull => COL_FIRST_APPT_BEFORE,
                                    _ => COL_FIRST_APPT_AFTER,
                                };
                                filtered.set_cell(row_idx, column, &date);
                            }
                        }
                        TradeType::Export => {
                            if outcome.calendar_found == Some(false) {
                                warn!(item_id = %item_id, "no appointment calendar found");
                            }
                        }
                    }
                    progress.record(&item_id, ItemStatus::Ok, epoch);
                    stats.probes_ok += 1;
                }
                Err(GatecheckError::CancelledByNewerJob) => {
                    return Err(GatecheckError::CancelledByNewerJob);
                }
                Err(e) => {
                    warn!(item_id = %item_id, error = %e, "probe failed after retries");
                    progress.record(&item_id, ItemStatus::Failed, epoch);
                    stats.probes_failed += 1;
                }
            }

            write_progress(job_folder, &progress)?;
            processed += 1;
            if processed % self.config.checkpoint_every == 0 {
                write_spreadsheet(&filtered_path, filtered)?;
            }
        }

        write_spreadsheet(&filtered_path, filtered)?;
        write_progress(job_folder, &progress)?;
        Ok(())
    }

    /// One probe, one retry: session recovery on invalidation, a plain
    /// second attempt on a transient fault.
    async fn probe_with_retry(
        &self,
        tenant: &Tenant,
        ordinal: Option<i64>,
        trade: TradeType,
        terminal: &str,
        move_type: MoveType,
        identifier: &str,
    ) -> Result<ProbeOutcome, GatecheckError> {
        let session = self.sessions.ensure(tenant, ordinal).await?;
        let move_type_str = move_type.to_string();
        let first = self
            .client
            .probe_appointments(
                &session,
                trade,
                terminal,
                &move_type_str,
                &self.config.trucking_company,
                identifier,
                &self.config.truck_plate,
                false,
            )
            .await;
        match first {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_session_invalid() => {
                warn!(error = %e, "probe hit invalid session, recovering");
                let session = self.sessions.recover(tenant, ordinal).await?;
                self.client
                    .probe_appointments(
                        &session,
                        trade,
                        terminal,
                        &move_type_str,
                        &self.config.trucking_company,
                        identifier,
                        &self.config.truck_plate,
                        false,
                    )
                    .await
                    .map_err(Into::into)
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "probe transient failure, retrying");
                self.client
                    .probe_appointments(
                        &session,
                        trade,
                        terminal,
                        &move_type_str,
                        &self.config.trucking_company,
                        identifier,
                        &self.config.truck_plate,
                        false,
                    )
                    .await
                    .map_err(Into::into)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persists the response payload (probe output plus the derived
    /// context that produced it) and, when present, the screenshot. A
    /// screenshot download failure is logged but never fails the item.
    #[allow(clippy::too_many_arguments)]
    async fn persist_probe_artifacts(
        &self,
        job_folder: &Path,
        item_id: &str,
        epoch: i64,
        trade: TradeType,
        terminal: &str,
        move_type: MoveType,
        identifier: &str,
        outcome: &ProbeOutcome,
    ) -> Result<(), GatecheckError> {
        let payload = serde_json::json!({
            "item_id": item_id,
            "trade_type": trade.to_string(),
            "terminal": terminal,
            "move_type": move_type.to_string(),
            "trucking_company": self.config.trucking_company,
            "identifier": identifier,
            "probe": outcome,
            "timestamp": epoch,
        });
        write_response(job_folder, item_id, epoch, &payload)?;

        if let Some(url) = outcome.screenshot_url.as_deref() {
            match self.client.download(url).await {
                Ok(shot) => {
                    write_screenshot(job_folder, item_id, epoch, &shot.bytes)?;
                }
                Err(e) => {
                    warn!(item_id = %item_id, error = %e, "screenshot download failed");
                }
            }
        }
        Ok(())
    }
}

/// Stage-3 products consumed by stage 4.
#[derive(Debug, Default)]
struct Enrichment {
    /// item id -> pregate flag, for import move-type derivation.
    pregate_passed: HashMap<String, bool>,
    /// item id -> full timeline, folded into the timeline columns.
    timelines: HashMap<String, Vec<gatecheck_upstream::Milestone>>,
    /// export item id -> booking number, the stage-4 probe identifier.
    bookings: HashMap<String, String>,
}
