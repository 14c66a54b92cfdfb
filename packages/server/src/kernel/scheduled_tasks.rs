//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The extraction sweep runs on a cron schedule: it enumerates active
//! providers and drives one watermark-tracked extraction per provider
//! for the current billing period. Exclusivity per (provider, period)
//! key comes from the in-process run-lock registry; the pipeline itself
//! performs no locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use metering::{BillingPeriod, ExtractionContext};

use crate::kernel::deps::ServerDeps;

/// Counters surfaced on the status route.
#[derive(Default)]
pub struct SchedulerState {
    last_tick: RwLock<Option<DateTime<Utc>>>,
    runs_completed: AtomicU64,
    files_uploaded: AtomicU64,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark_tick(&self) {
        *self.last_tick.write().unwrap() = Some(Utc::now());
    }

    fn record_run(&self, uploaded: usize) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.files_uploaded
            .fetch_add(uploaded as u64, Ordering::Relaxed);
    }

    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        *self.last_tick.read().unwrap()
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn files_uploaded(&self) -> u64 {
        self.files_uploaded.load(Ordering::Relaxed)
    }
}

/// Start all scheduled tasks
pub async fn start_scheduler(deps: Arc<ServerDeps>, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_deps = deps.clone();
    let sweep_job = Job::new_async(schedule, move |_uuid, _lock| {
        let deps = sweep_deps.clone();
        Box::pin(async move {
            if let Err(e) = run_extraction_sweep(&deps).await {
                tracing::error!("Extraction sweep failed: {}", e);
            }
        })
    })?;
    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (extraction sweep on '{schedule}')");
    Ok(scheduler)
}

/// Run one extraction sweep over all active providers.
pub async fn run_extraction_sweep(deps: &ServerDeps) -> Result<()> {
    deps.scheduler_state.mark_tick();
    let providers = deps.catalog.active_providers().await?;
    if providers.is_empty() {
        tracing::info!("No active providers, nothing to extract");
        return Ok(());
    }
    tracing::info!("Running extraction sweep over {} providers", providers.len());

    let period = BillingPeriod::containing(Utc::now());
    let period_start = period.start();
    for provider in providers {
        let tracing_id = Uuid::new_v4().to_string();
        let ctx = match ExtractionContext::new(
            provider.id,
            &provider.provider_type,
            provider.schema.as_str(),
            tracing_id.as_str(),
        ) {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::debug!(
                    provider_id = %provider.id,
                    error = %err,
                    "provider not eligible for metered extraction"
                );
                continue;
            }
        };

        let Some(_guard) = deps.run_locks.try_acquire(provider.id, period) else {
            tracing::info!(
                provider_id = %provider.id,
                %period,
                "extraction already running for this key, skipping"
            );
            continue;
        };

        match deps.extractor.run(&ctx, period_start).await {
            Ok(keys) => {
                deps.scheduler_state.record_run(keys.len());
                tracing::info!(
                    tracing_id,
                    provider_id = %provider.id,
                    uploaded = keys.len(),
                    "extraction run complete"
                );
            }
            Err(err) => {
                tracing::error!(
                    tracing_id,
                    provider_id = %provider.id,
                    error = %err,
                    "extraction run failed"
                );
            }
        }
    }
    Ok(())
}
