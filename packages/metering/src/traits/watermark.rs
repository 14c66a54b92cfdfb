//! The watermark persistence seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::types::{period::BillingPeriod, watermark::Watermark};

/// Schema-scoped persistence for per-(provider, period) resume state.
///
/// `advance` is called exactly once per successful orchestrator run,
/// after all pages have been attempted. The store performs no locking;
/// the caller guarantees single-writer access per key (see the run-lock
/// registry on the server side).
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the stored watermark for a key, if one exists.
    async fn read(
        &self,
        provider_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Option<Watermark>, ExtractionError>;

    /// Upsert the watermark for a key: create if absent, otherwise
    /// overwrite the stored timestamp unconditionally.
    async fn advance(
        &self,
        provider_id: Uuid,
        period: BillingPeriod,
        new_time: DateTime<Utc>,
    ) -> Result<(), ExtractionError>;
}
