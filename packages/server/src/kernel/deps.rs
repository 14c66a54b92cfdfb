//! Shared service dependencies.
//!
//! Every external collaborator of the extraction pipeline is
//! constructed here and injected explicitly; nothing holds a cached
//! process-wide client.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use url::Url;

use metering::{
    ExporterConfig, ExtractorConfig, PostgresProviderCatalog, PostgresWatermarkStore,
    ProviderCatalog, QueryEngine, RecordExporter, S3ObjectStore, TrinoQueryEngine,
    UsageExtractor, WatermarkStore,
};

use crate::config::Config;
use crate::kernel::run_lock::RunLockRegistry;
use crate::kernel::scheduled_tasks::SchedulerState;

/// Handles shared by the routes and the scheduler.
pub struct ServerDeps {
    pub extractor: Arc<UsageExtractor>,
    pub catalog: Arc<dyn ProviderCatalog>,
    pub run_locks: Arc<RunLockRegistry>,
    pub scheduler_state: Arc<SchedulerState>,
}

impl ServerDeps {
    pub fn new(extractor: Arc<UsageExtractor>, catalog: Arc<dyn ProviderCatalog>) -> Self {
        Self {
            extractor,
            catalog,
            run_locks: Arc::new(RunLockRegistry::new()),
            scheduler_state: Arc::new(SchedulerState::new()),
        }
    }

    /// Production wiring: Trino engine, S3 object store, Postgres
    /// watermark store and provider catalog.
    pub async fn from_config(config: &Config, pool: PgPool) -> Result<Self> {
        let trino_url = Url::parse(&config.trino_url).context("TRINO_URL must be a valid URL")?;
        let engine: Arc<dyn QueryEngine> = Arc::new(TrinoQueryEngine::new(
            trino_url,
            config.trino_user.clone(),
            config.trino_catalog.clone(),
        ));
        let object_store = Arc::new(S3ObjectStore::from_env().await);
        let watermarks: Arc<dyn WatermarkStore> =
            Arc::new(PostgresWatermarkStore::new(pool.clone()));
        let catalog: Arc<dyn ProviderCatalog> = Arc::new(PostgresProviderCatalog::new(pool));

        let exporter = RecordExporter::new(
            object_store,
            ExporterConfig::new(config.metering_bucket.clone())
                .with_upload_timeout(config.upload_timeout),
        );
        let extractor = Arc::new(UsageExtractor::new(
            engine,
            watermarks,
            catalog.clone(),
            exporter,
            ExtractorConfig {
                batch_size: config.batch_size,
            },
        ));

        Ok(Self::new(extractor, catalog))
    }
}
