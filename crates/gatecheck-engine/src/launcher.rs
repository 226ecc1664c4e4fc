// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job creation and background dispatch.
//!
//! [`JobLauncher::trigger`] is the single entry point both the gateway
//! and the scheduler use: create a pending job row, spawn the pipeline on
//! its own worker, return immediately. No idempotency here: two
//! concurrent triggers create two jobs, and the newer ordinal supersedes
//! the older one at its next cancellation observation point.

use std::path::Path;
use std::sync::Arc;

use gatecheck_core::{GatecheckError, Platform};
use gatecheck_store::queries::jobs;
use gatecheck_store::{Database, Job, Tenant};
use tracing::info;

use crate::pipeline::PipelineRunner;

/// Creates job records and spawns their pipeline runs.
pub struct JobLauncher {
    db: Database,
    runner: Arc<PipelineRunner>,
}

impl JobLauncher {
    /// Creates a launcher over the shared store and pipeline runner.
    pub fn new(db: Database, runner: Arc<PipelineRunner>) -> Self {
        Self { db, runner }
    }

    /// Create a pending job for the tenant and start its run in the
    /// background. Returns the pending job record immediately.
    pub async fn trigger(
        &self,
        tenant: &Tenant,
        platform: Platform,
    ) -> Result<Job, GatecheckError> {
        let queries_root = gatecheck_artifacts::queries_dir(Path::new(&tenant.folder_path));
        let job = jobs::create_job(
            &self.db,
            tenant.id,
            &platform.to_string(),
            &queries_root.to_string_lossy(),
        )
        .await?;

        info!(
            query_id = %job.query_id,
            tenant_id = tenant.id,
            "job created, spawning pipeline worker"
        );

        let runner = self.runner.clone();
        let tenant = tenant.clone();
        let spawned = job.clone();
        tokio::spawn(async move {
            runner.run(&tenant, &spawned).await;
        });

        Ok(job)
    }
}
