//! Resolution of the extraction window's lower bound.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::debug;

use crate::error::Result;
use crate::traits::{ProviderCatalog, WatermarkStore};
use crate::types::{context::ExtractionContext, period::BillingPeriod};

/// Computes where a run should start extracting from.
pub struct WindowResolver {
    watermarks: Arc<dyn WatermarkStore>,
    catalog: Arc<dyn ProviderCatalog>,
}

impl WindowResolver {
    pub fn new(watermarks: Arc<dyn WatermarkStore>, catalog: Arc<dyn ProviderCatalog>) -> Self {
        Self {
            watermarks,
            catalog,
        }
    }

    /// Resolve the start of the extraction window for one run.
    ///
    /// A stored watermark resumes one second past the last processed
    /// timestamp, so no record at the exact boundary is reprocessed or
    /// skipped. With no watermark the run covers the period from its
    /// first moment. Either way the start is clamped so extraction never
    /// reaches back before the provider existed: a start earlier than
    /// the provider's creation resets to the midnight of the day before
    /// creation, keeping a full trailing day for timezone slack.
    pub async fn resolve_start(
        &self,
        ctx: &ExtractionContext,
        period: BillingPeriod,
        period_start: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let resumed = self
            .watermarks
            .read(ctx.provider_id, period)
            .await?
            .map(|w| w.latest_processed_time + Duration::seconds(1));
        let base_time = resumed.unwrap_or(period_start);

        let created = self.catalog.created_at(ctx.provider_id).await?;
        if base_time < created {
            let creation_midnight = created.date_naive().and_time(NaiveTime::MIN).and_utc();
            let clamped = creation_midnight - Duration::days(1);
            debug!(
                tracing_id = %ctx.tracing_id,
                %base_time,
                %clamped,
                "start precedes provider creation, clamping"
            );
            return Ok(clamped);
        }
        Ok(base_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    use crate::stores::memory::{MemoryProviderCatalog, MemoryWatermarkStore};
    use crate::types::provider::ProviderRecord;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn context(provider_id: Uuid) -> ExtractionContext {
        ExtractionContext::new(provider_id, "AWS", "acct10001", "trace-1").unwrap()
    }

    fn resolver_with_provider(
        provider_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> (WindowResolver, Arc<MemoryWatermarkStore>) {
        let watermarks = Arc::new(MemoryWatermarkStore::new());
        let catalog = Arc::new(MemoryProviderCatalog::new());
        catalog.insert(ProviderRecord {
            id: provider_id,
            provider_type: "AWS".to_string(),
            schema: "acct10001".to_string(),
            created_at,
        });
        (
            WindowResolver::new(watermarks.clone(), catalog),
            watermarks,
        )
    }

    #[tokio::test]
    async fn test_no_watermark_starts_at_period_start() {
        let provider_id = Uuid::new_v4();
        let (resolver, _) = resolver_with_provider(provider_id, utc(2024, 1, 15, 8, 0, 0));
        let ctx = context(provider_id);
        let period = BillingPeriod { year: 2024, month: 3 };

        let start = resolver
            .resolve_start(&ctx, period, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();
        assert_eq!(start, utc(2024, 3, 1, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_watermark_resumes_one_second_later() {
        let provider_id = Uuid::new_v4();
        let (resolver, watermarks) =
            resolver_with_provider(provider_id, utc(2024, 1, 15, 8, 0, 0));
        let ctx = context(provider_id);
        let period = BillingPeriod { year: 2024, month: 3 };
        watermarks
            .advance(provider_id, period, utc(2024, 3, 10, 12, 0, 0))
            .await
            .unwrap();

        let start = resolver
            .resolve_start(&ctx, period, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();
        assert_eq!(start, utc(2024, 3, 10, 12, 0, 1));
    }

    #[tokio::test]
    async fn test_start_before_creation_clamps_to_prior_midnight() {
        let provider_id = Uuid::new_v4();
        // Created mid-day March 1st; a March 1st 00:00 start precedes it.
        let (resolver, _) = resolver_with_provider(provider_id, utc(2024, 3, 1, 14, 30, 45));
        let ctx = context(provider_id);
        let period = BillingPeriod { year: 2024, month: 3 };

        let start = resolver
            .resolve_start(&ctx, period, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();
        assert_eq!(start, utc(2024, 2, 29, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_clamp_applies_regardless_of_distance() {
        let provider_id = Uuid::new_v4();
        let (resolver, _) = resolver_with_provider(provider_id, utc(2024, 6, 20, 1, 2, 3));
        let ctx = context(provider_id);
        let period = BillingPeriod { year: 2024, month: 3 };

        let start = resolver
            .resolve_start(&ctx, period, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();
        assert_eq!(start, utc(2024, 6, 19, 0, 0, 0));
    }
}
