// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant periodic harvest scheduling.
//!
//! One process-wide [`Scheduler`] owns a task registry keyed by tenant
//! id. Each enabled tenant gets its own interval task; a tick enqueues a
//! pipeline run only when the tenant has no in_progress job, so missed
//! ticks coalesce into the next free one. Pause, resume, and frequency
//! updates are registry mutations that also persist the tenant's
//! schedule settings.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gatecheck_core::{GatecheckError, Platform};
use gatecheck_store::queries::{jobs, tenants};
use gatecheck_store::{Database, Tenant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::launcher::JobLauncher;

struct TenantTask {
    cancel: CancellationToken,
    frequency_minutes: u64,
}

/// Process-wide scheduler over all tenants with scheduling enabled.
pub struct Scheduler {
    db: Database,
    launcher: Arc<JobLauncher>,
    registry: DashMap<i64, TenantTask>,
    shutdown: CancellationToken,
    default_frequency_minutes: u64,
}

impl Scheduler {
    /// Creates a scheduler. Tenant tasks are children of `shutdown`, so
    /// cancelling it stops every tick loop.
    pub fn new(
        db: Database,
        launcher: Arc<JobLauncher>,
        shutdown: CancellationToken,
        default_frequency_minutes: u64,
    ) -> Self {
        Self {
            db,
            launcher,
            registry: DashMap::new(),
            shutdown,
            default_frequency_minutes,
        }
    }

    /// Enumerate enabled tenants and arm a tick task for each.
    pub async fn start(&self) -> Result<(), GatecheckError> {
        let scheduled = tenants::list_scheduled_tenants(&self.db).await?;
        info!(count = scheduled.len(), "scheduler starting");
        for tenant in scheduled {
            self.arm(&tenant);
        }
        Ok(())
    }

    /// Number of tenants currently armed.
    pub fn armed_count(&self) -> usize {
        self.registry.len()
    }

    /// Arm (or re-arm) the periodic tick for a tenant.
    pub fn arm(&self, tenant: &Tenant) {
        self.disarm(tenant.id);

        let frequency_minutes = if tenant.schedule_frequency_minutes >= 1 {
            tenant.schedule_frequency_minutes as u64
        } else {
            self.default_frequency_minutes
        };
        let cancel = self.shutdown.child_token();
        self.registry.insert(
            tenant.id,
            TenantTask {
                cancel: cancel.clone(),
                frequency_minutes,
            },
        );

        let db = self.db.clone();
        let launcher = self.launcher.clone();
        let tenant_id = tenant.id;
        info!(tenant_id, frequency_minutes, "tenant schedule armed");

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(frequency_minutes * 60));
            // Coalesce: a tick delayed past the next period runs once.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the immediate first tick; the first harvest runs one
            // full period after arming.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tick(&db, &launcher, tenant_id).await;
                    }
                    _ = cancel.cancelled() => {
                        debug!(tenant_id, "tenant schedule task shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// Remove a tenant's tick task, if armed.
    pub fn disarm(&self, tenant_id: i64) {
        if let Some((_, task)) = self.registry.remove(&tenant_id) {
            task.cancel.cancel();
            debug!(tenant_id, "tenant schedule disarmed");
        }
    }

    /// Disable scheduling for a tenant: persist enabled=false and cancel
    /// future ticks. A run already in flight is unaffected.
    pub async fn pause(&self, tenant_id: i64) -> Result<(), GatecheckError> {
        if let Some(tenant) = tenants::get_tenant(&self.db, tenant_id).await? {
            tenants::set_schedule(&self.db, tenant_id, false, tenant.schedule_frequency_minutes)
                .await?;
        }
        self.disarm(tenant_id);
        info!(tenant_id, "schedule paused");
        Ok(())
    }

    /// Re-enable scheduling for a tenant and re-arm its tick.
    pub async fn resume(&self, tenant_id: i64) -> Result<(), GatecheckError> {
        let Some(tenant) = tenants::get_tenant(&self.db, tenant_id).await? else {
            return Ok(());
        };
        tenants::set_schedule(&self.db, tenant_id, true, tenant.schedule_frequency_minutes)
            .await?;
        let tenant = tenants::get_tenant(&self.db, tenant_id)
            .await?
            .expect("tenant row just updated");
        self.arm(&tenant);
        info!(tenant_id, "schedule resumed");
        Ok(())
    }

    /// Change a tenant's harvest frequency and reschedule.
    pub async fn update_frequency(
        &self,
        tenant_id: i64,
        frequency_minutes: i64,
    ) -> Result<(), GatecheckError> {
        if frequency_minutes < 1 {
            return Err(GatecheckError::Config(
                "frequency must be at least 1 minute".to_string(),
            ));
        }
        let Some(tenant) = tenants::get_tenant(&self.db, tenant_id).await? else {
            return Ok(());
        };
        tenants::set_schedule(&self.db, tenant_id, tenant.schedule_enabled, frequency_minutes)
            .await?;
        if tenant.schedule_enabled {
            let tenant = tenants::get_tenant(&self.db, tenant_id)
                .await?
                .expect("tenant row just updated");
            self.arm(&tenant);
        }
        info!(tenant_id, frequency_minutes, "schedule frequency updated");
        Ok(())
    }

    /// Armed frequency for a tenant, for surfacing in status responses.
    pub fn armed_frequency(&self, tenant_id: i64) -> Option<u64> {
        self.registry.get(&tenant_id).map(|t| t.frequency_minutes)
    }
}

/// One scheduler tick for one tenant: skip when disabled or while a job
/// is still in flight, otherwise enqueue a run.
async fn tick(db: &Database, launcher: &JobLauncher, tenant_id: i64) {
    let tenant = match tenants::get_tenant(db, tenant_id).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => {
            warn!(tenant_id, "scheduled tenant no longer exists");
            return;
        }
        Err(e) => {
            warn!(tenant_id, error = %e, "scheduler tick could not load tenant");
            return;
        }
    };
    if !tenant.schedule_enabled {
        debug!(tenant_id, "tick skipped: schedule disabled");
        return;
    }

    match jobs::has_other_in_progress(db, tenant_id, None).await {
        Ok(true) => {
            debug!(tenant_id, "tick skipped: job already in progress");
        }
        Ok(false) => match launcher.trigger(&tenant, Platform::Emodal).await {
            Ok(job) => {
                info!(tenant_id, query_id = %job.query_id, "scheduled harvest enqueued");
            }
            Err(e) => {
                warn!(tenant_id, error = %e, "scheduled trigger failed");
            }
        },
        Err(e) => {
            warn!(tenant_id, error = %e, "scheduler tick could not check job state");
        }
    }
}
