//! The extraction orchestrator.
//!
//! One run: resolve window → count → page → export → advance watermark.
//! A run that finds no end timestamp or no matching records exits
//! without touching the watermark. Once the page loop has been entered,
//! the watermark advances to the resolved end regardless of per-page
//! upload outcomes; pages that failed to upload are logged as a
//! reconciliation gap.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::export::RecordExporter;
use crate::pipeline::pager::pages;
use crate::pipeline::query;
use crate::pipeline::window::WindowResolver;
use crate::traits::{ProviderCatalog, QueryEngine, WatermarkStore};
use crate::types::{context::ExtractionContext, period::BillingPeriod};

pub(crate) const LATEST_USAGE_LOG_REF: &str = "determine_latest_usage_time";
pub(crate) const COUNT_LOG_REF: &str = "determine_processing_count";
pub(crate) const PAGE_LOG_REF: &str = "usage_page_query";

/// Orchestrator settings for one deployment.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Rows per exported page.
    pub batch_size: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            batch_size: 200_000,
        }
    }
}

/// Drives watermark-tracked extraction of usage line items.
pub struct UsageExtractor {
    engine: Arc<dyn QueryEngine>,
    watermarks: Arc<dyn WatermarkStore>,
    window: WindowResolver,
    exporter: RecordExporter,
    batch_size: u64,
}

impl UsageExtractor {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        watermarks: Arc<dyn WatermarkStore>,
        catalog: Arc<dyn ProviderCatalog>,
        exporter: RecordExporter,
        config: ExtractorConfig,
    ) -> Self {
        let window = WindowResolver::new(watermarks.clone(), catalog);
        Self {
            engine,
            watermarks,
            window,
            exporter,
            batch_size: config.batch_size,
        }
    }

    /// Run one extraction for the billing period containing
    /// `period_start`. Returns the keys of successfully uploaded
    /// artifacts, in page order; the sequence may be shorter than the
    /// page count when individual uploads fail.
    ///
    /// Safe to call repeatedly: a run either completes its page loop and
    /// advances the watermark, or fails before the loop and leaves state
    /// untouched. Callers must not run two extractions for the same
    /// (provider, year, month) key concurrently.
    pub async fn run(
        &self,
        ctx: &ExtractionContext,
        period_start: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        info!(
            tracing_id = %ctx.tracing_id,
            context = %ctx.log_context,
            "beginning metered usage extraction"
        );
        let period = BillingPeriod::containing(period_start);
        let start_time = self.window.resolve_start(ctx, period, period_start).await?;

        let Some(end_time) = self.determine_end_time(ctx, period).await? else {
            info!(
                tracing_id = %ctx.tracing_id,
                context = %ctx.log_context,
                "no usage data landed for {period}, nothing to extract"
            );
            return Ok(Vec::new());
        };

        let clause = query::where_clause(ctx, period, start_time, end_time);
        let total_count = self.determine_line_item_count(ctx, &clause).await?;
        debug!(
            tracing_id = %ctx.tracing_id,
            context = %ctx.log_context,
            "identified {total_count} matching records for metered usage"
        );
        if total_count == 0 {
            info!(
                tracing_id = %ctx.tracing_id,
                context = %ctx.log_context,
                "no matching records in window, nothing to extract"
            );
            return Ok(Vec::new());
        }

        let filename_prefix = format!("usage_{}_", ctx.tracing_id);
        let mut upload_keys = Vec::new();
        let mut attempted_pages = 0usize;
        for page_descriptor in pages(total_count, self.batch_size) {
            let sql = query::page_sql(ctx, &clause, page_descriptor.offset, page_descriptor.limit);
            let page = self.engine.execute_with_columns(&sql, PAGE_LOG_REF).await?;
            let filename = format!("{filename_prefix}{}.csv", page_descriptor.index);
            if let Some(key) = self.exporter.export(ctx, &page, &filename).await? {
                upload_keys.push(key);
            }
            attempted_pages += 1;
        }

        self.watermarks
            .advance(ctx.provider_id, period, end_time)
            .await?;

        if upload_keys.len() < attempted_pages {
            warn!(
                tracing_id = %ctx.tracing_id,
                context = %ctx.log_context,
                failed = attempted_pages - upload_keys.len(),
                "watermark advanced past pages that failed to upload"
            );
        }
        info!(
            tracing_id = %ctx.tracing_id,
            context = %ctx.log_context,
            "{} file(s) uploaded for metered usage",
            upload_keys.len()
        );
        Ok(upload_keys)
    }

    /// Latest usage-start timestamp present in the source table, the
    /// upper bound for this run. `None` means no data has landed.
    async fn determine_end_time(
        &self,
        ctx: &ExtractionContext,
        period: BillingPeriod,
    ) -> Result<Option<DateTime<Utc>>> {
        let sql = query::latest_usage_sql(ctx, period);
        let rows = self.engine.execute(&sql, LATEST_USAGE_LOG_REF).await?;
        let Some(value) = rows.first().and_then(|row| row.first()) else {
            return Ok(None);
        };
        match value {
            Value::Null => Ok(None),
            Value::String(text) => parse_engine_timestamp(text)
                .map(Some)
                .ok_or_else(|| ExtractionError::MalformedResult {
                    log_ref: LATEST_USAGE_LOG_REF,
                    reason: format!("unparseable timestamp {text:?}"),
                }),
            other => Err(ExtractionError::MalformedResult {
                log_ref: LATEST_USAGE_LOG_REF,
                reason: format!("expected timestamp, got {other}"),
            }),
        }
    }

    async fn determine_line_item_count(
        &self,
        ctx: &ExtractionContext,
        clause: &str,
    ) -> Result<u64> {
        let sql = query::count_sql(ctx, clause);
        let rows = self.engine.execute(&sql, COUNT_LOG_REF).await?;
        let value = rows.first().and_then(|row| row.first()).ok_or_else(|| {
            ExtractionError::MalformedResult {
                log_ref: COUNT_LOG_REF,
                reason: "empty count result".to_string(),
            }
        })?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| ExtractionError::MalformedResult {
                log_ref: COUNT_LOG_REF,
                reason: format!("expected count, got {value}"),
            })
    }
}

/// Engine timestamps arrive as text; accept RFC 3339 or the engine's
/// space-separated rendering, with or without fractional seconds.
fn parse_engine_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeZone;
    use uuid::Uuid;

    use crate::pipeline::export::{ExporterConfig, RecordExporter};
    use crate::stores::memory::{
        MemoryObjectStore, MemoryProviderCatalog, MemoryWatermarkStore,
    };
    use crate::testing::{FlakyObjectStore, MockQueryEngine};
    use crate::traits::ObjectStore;
    use crate::types::provider::ProviderRecord;

    const BUCKET: &str = "metering-bucket";

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    struct Harness {
        extractor: UsageExtractor,
        watermarks: Arc<MemoryWatermarkStore>,
        ctx: ExtractionContext,
    }

    fn harness(engine: MockQueryEngine, store: Arc<dyn ObjectStore>) -> Harness {
        let provider_id = Uuid::new_v4();
        let watermarks = Arc::new(MemoryWatermarkStore::new());
        let catalog = Arc::new(MemoryProviderCatalog::new());
        catalog.insert(ProviderRecord {
            id: provider_id,
            provider_type: "AWS".to_string(),
            schema: "acct10001".to_string(),
            created_at: utc(2024, 1, 1, 0, 0, 0),
        });
        let exporter = RecordExporter::new(
            store,
            ExporterConfig::new(BUCKET).with_upload_timeout(Duration::from_secs(5)),
        );
        let extractor = UsageExtractor::new(
            Arc::new(engine),
            watermarks.clone(),
            catalog,
            exporter,
            ExtractorConfig { batch_size: 100 },
        );
        let ctx = ExtractionContext::new(provider_id, "AWS", "acct10001", "trace-1").unwrap();
        Harness {
            extractor,
            watermarks,
            ctx,
        }
    }

    #[tokio::test]
    async fn test_run_exports_all_pages_and_advances_watermark() {
        let end = utc(2024, 3, 10, 12, 0, 0);
        let engine = MockQueryEngine::new()
            .with_latest_usage_time(end)
            .with_count(250)
            .with_page_rows(3);
        let store = Arc::new(MemoryObjectStore::new());
        let h = harness(engine, store.clone());

        let keys = h
            .extractor
            .run(&h.ctx, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();

        assert_eq!(keys.len(), 3);
        assert!(keys[0].ends_with("usage_trace-1_0.csv"));
        assert!(keys[2].ends_with("usage_trace-1_2.csv"));
        let period = BillingPeriod { year: 2024, month: 3 };
        assert_eq!(h.watermarks.get(h.ctx.provider_id, period), Some(end));
    }

    #[tokio::test]
    async fn test_no_end_time_skips_run_without_watermark_mutation() {
        let engine = MockQueryEngine::new().with_count(250).with_page_rows(3);
        let h = harness(engine, Arc::new(MemoryObjectStore::new()));

        let keys = h
            .extractor
            .run(&h.ctx, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();

        assert!(keys.is_empty());
        assert_eq!(h.watermarks.len(), 0);
    }

    #[tokio::test]
    async fn test_zero_count_skips_run_without_watermark_mutation() {
        let engine = MockQueryEngine::new()
            .with_latest_usage_time(utc(2024, 3, 10, 12, 0, 0))
            .with_count(0);
        let h = harness(engine, Arc::new(MemoryObjectStore::new()));

        let keys = h
            .extractor
            .run(&h.ctx, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();

        assert!(keys.is_empty());
        assert_eq!(h.watermarks.len(), 0);
    }

    #[tokio::test]
    async fn test_failed_page_does_not_block_later_pages() {
        let end = utc(2024, 3, 10, 12, 0, 0);
        let engine = MockQueryEngine::new()
            .with_latest_usage_time(end)
            .with_count(250)
            .with_page_rows(3);
        // Page index 1 fails to upload; 0 and 2 succeed.
        let store = Arc::new(FlakyObjectStore::failing_on(["usage_trace-1_1.csv"]));
        let h = harness(engine, store.clone());

        let keys = h
            .extractor
            .run(&h.ctx, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap();

        assert_eq!(keys.len(), 2);
        assert!(keys[0].ends_with("usage_trace-1_0.csv"));
        assert!(keys[1].ends_with("usage_trace-1_2.csv"));
        // All three pages were attempted exactly once.
        assert_eq!(store.attempts().len(), 3);
        // Watermark still advanced to the resolved end.
        let period = BillingPeriod { year: 2024, month: 3 };
        assert_eq!(h.watermarks.get(h.ctx.provider_id, period), Some(end));
    }

    #[tokio::test]
    async fn test_engine_failure_aborts_before_watermark_mutation() {
        let engine = MockQueryEngine::unreachable();
        let h = harness(engine, Arc::new(MemoryObjectStore::new()));

        let err = h
            .extractor
            .run(&h.ctx, utc(2024, 3, 1, 0, 0, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Engine(_)));
        assert_eq!(h.watermarks.len(), 0);
    }

    #[tokio::test]
    async fn test_watermark_is_monotonic_across_runs() {
        let period_start = utc(2024, 3, 1, 0, 0, 0);
        let period = BillingPeriod { year: 2024, month: 3 };

        let first_end = utc(2024, 3, 10, 12, 0, 0);
        let engine = MockQueryEngine::new()
            .with_latest_usage_time(first_end)
            .with_count(50)
            .with_page_rows(1);
        let h = harness(engine, Arc::new(MemoryObjectStore::new()));
        h.extractor.run(&h.ctx, period_start).await.unwrap();
        assert_eq!(h.watermarks.get(h.ctx.provider_id, period), Some(first_end));

        // A later run against the same store sees newer data.
        let second_end = utc(2024, 3, 12, 6, 0, 0);
        let engine = MockQueryEngine::new()
            .with_latest_usage_time(second_end)
            .with_count(50)
            .with_page_rows(1);
        let catalog = Arc::new(MemoryProviderCatalog::new());
        catalog.insert(ProviderRecord {
            id: h.ctx.provider_id,
            provider_type: "AWS".to_string(),
            schema: "acct10001".to_string(),
            created_at: utc(2024, 1, 1, 0, 0, 0),
        });
        let extractor = UsageExtractor::new(
            Arc::new(engine),
            h.watermarks.clone(),
            catalog,
            RecordExporter::new(
                Arc::new(MemoryObjectStore::new()),
                ExporterConfig::new(BUCKET),
            ),
            ExtractorConfig { batch_size: 100 },
        );
        extractor.run(&h.ctx, period_start).await.unwrap();
        assert_eq!(
            h.watermarks.get(h.ctx.provider_id, period),
            Some(second_end)
        );
    }

    #[test]
    fn test_parse_engine_timestamp_formats() {
        let expected = utc(2024, 3, 10, 12, 0, 0);
        assert_eq!(
            parse_engine_timestamp("2024-03-10T12:00:00Z"),
            Some(expected)
        );
        assert_eq!(
            parse_engine_timestamp("2024-03-10 12:00:00"),
            Some(expected)
        );
        assert_eq!(
            parse_engine_timestamp("2024-03-10 12:00:00.000"),
            Some(expected)
        );
        assert_eq!(parse_engine_timestamp("not a timestamp"), None);
    }
}
