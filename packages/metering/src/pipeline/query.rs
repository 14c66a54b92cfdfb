//! SQL text for the analytical engine.
//!
//! The engine is an opaque executor; the statements it runs are decided
//! here. Timestamps are rendered as engine TIMESTAMP literals with
//! second precision.

use chrono::{DateTime, Utc};

use crate::types::{context::ExtractionContext, period::BillingPeriod};

fn timestamp_literal(ts: DateTime<Utc>) -> String {
    format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S"))
}

/// Predicate selecting unprocessed, meterable records in the window.
///
/// The window is half-open at the bottom: strictly greater than the
/// resolved start, less than or equal to the end.
pub(crate) fn where_clause(
    ctx: &ExtractionContext,
    period: BillingPeriod,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> String {
    let usage_col = ctx.provider_kind.usage_start_column();
    format!(
        "WHERE source='{}' AND year='{}' AND month='{}' AND {} AND {} > {} AND {} <= {}",
        ctx.provider_id,
        period.year_str(),
        period.month_str(),
        ctx.provider_kind.eligibility_predicate(),
        usage_col,
        timestamp_literal(start_time),
        usage_col,
        timestamp_literal(end_time),
    )
}

/// Count of records matching the predicate.
pub(crate) fn count_sql(ctx: &ExtractionContext, clause: &str) -> String {
    format!(
        "SELECT count(*) FROM {}.{} {}",
        ctx.schema,
        ctx.provider_kind.line_item_table(),
        clause,
    )
}

/// Latest usage-start timestamp present for the (provider, period) key.
pub(crate) fn latest_usage_sql(ctx: &ExtractionContext, period: BillingPeriod) -> String {
    format!(
        "SELECT MAX({}) FROM {}.{} WHERE source='{}' AND year='{}' AND month='{}'",
        ctx.provider_kind.usage_start_column(),
        ctx.schema,
        ctx.provider_kind.line_item_table(),
        ctx.provider_id,
        period.year_str(),
        period.month_str(),
    )
}

/// One page of matching records, ordered for stable pagination.
pub(crate) fn page_sql(ctx: &ExtractionContext, clause: &str, offset: u64, limit: u64) -> String {
    format!(
        "SELECT * FROM {}.{} {} ORDER BY {} OFFSET {} LIMIT {}",
        ctx.schema,
        ctx.provider_kind.line_item_table(),
        clause,
        ctx.provider_kind.usage_start_column(),
        offset,
        limit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn fixture() -> (ExtractionContext, BillingPeriod) {
        let ctx = ExtractionContext::new(
            Uuid::nil(),
            "AWS",
            "acct10001",
            "trace-1",
        )
        .unwrap();
        (ctx, BillingPeriod { year: 2024, month: 3 })
    }

    #[test]
    fn test_where_clause_is_half_open() {
        let (ctx, period) = fixture();
        let clause = where_clause(
            &ctx,
            period,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
        );
        assert!(clause.contains("lineitem_usagestartdate > TIMESTAMP '2024-03-01 00:00:00'"));
        assert!(clause.contains("lineitem_usagestartdate <= TIMESTAMP '2024-03-10 00:00:00'"));
        assert!(clause.contains("month='03'"));
    }

    #[test]
    fn test_count_and_page_target_schema_qualified_table() {
        let (ctx, period) = fixture();
        let clause = where_clause(
            &ctx,
            period,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
        );
        let count = count_sql(&ctx, &clause);
        assert!(count.starts_with("SELECT count(*) FROM acct10001.aws_line_items WHERE"));

        let page = page_sql(&ctx, &clause, 200, 100);
        assert!(page.contains("FROM acct10001.aws_line_items"));
        assert!(page.ends_with("OFFSET 200 LIMIT 100"));
    }
}
