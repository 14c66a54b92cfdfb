//! PostgreSQL-backed watermark store and provider catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::traits::{ProviderCatalog, WatermarkStore};
use crate::types::{
    period::BillingPeriod,
    provider::ProviderRecord,
    watermark::Watermark,
};

fn storage_err(err: sqlx::Error) -> ExtractionError {
    ExtractionError::Watermark(Box::new(err))
}

fn catalog_err(err: sqlx::Error) -> ExtractionError {
    ExtractionError::Catalog(Box::new(err))
}

#[derive(FromRow)]
struct WatermarkRow {
    source_id: Uuid,
    year: i32,
    month: i32,
    latest_processed_time: DateTime<Utc>,
}

/// Watermark persistence in the `usage_last_processed` table.
///
/// `advance` is a keyed upsert; concurrency control is the caller's
/// responsibility (single writer per key).
pub struct PostgresWatermarkStore {
    pool: PgPool,
}

impl PostgresWatermarkStore {
    /// Reuse an existing connection pool (the server's).
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for PostgresWatermarkStore {
    async fn read(
        &self,
        provider_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Option<Watermark>, ExtractionError> {
        let row: Option<WatermarkRow> = sqlx::query_as(
            "SELECT source_id, year, month, latest_processed_time \
             FROM usage_last_processed \
             WHERE source_id = $1 AND year = $2 AND month = $3",
        )
        .bind(provider_id)
        .bind(period.year)
        .bind(period.month as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|r| {
            Watermark::new(
                r.source_id,
                BillingPeriod {
                    year: r.year,
                    month: r.month as u32,
                },
                r.latest_processed_time,
            )
        }))
    }

    async fn advance(
        &self,
        provider_id: Uuid,
        period: BillingPeriod,
        new_time: DateTime<Utc>,
    ) -> Result<(), ExtractionError> {
        sqlx::query(
            "INSERT INTO usage_last_processed (source_id, year, month, latest_processed_time) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (source_id, year, month) \
             DO UPDATE SET latest_processed_time = EXCLUDED.latest_processed_time",
        )
        .bind(provider_id)
        .bind(period.year)
        .bind(period.month as i32)
        .bind(new_time)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

#[derive(FromRow)]
struct ProviderRow {
    id: Uuid,
    provider_type: String,
    schema_name: String,
    created_timestamp: DateTime<Utc>,
}

impl From<ProviderRow> for ProviderRecord {
    fn from(row: ProviderRow) -> Self {
        ProviderRecord {
            id: row.id,
            provider_type: row.provider_type,
            schema: row.schema_name,
            created_at: row.created_timestamp,
        }
    }
}

/// Provider registry reads from the `providers` table.
pub struct PostgresProviderCatalog {
    pool: PgPool,
}

impl PostgresProviderCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderCatalog for PostgresProviderCatalog {
    async fn created_at(&self, provider_id: Uuid) -> Result<DateTime<Utc>, ExtractionError> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT created_timestamp FROM providers WHERE id = $1")
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(catalog_err)?;
        row.map(|(ts,)| ts).ok_or_else(|| {
            ExtractionError::Catalog(format!("unknown provider {provider_id}").into())
        })
    }

    async fn active_providers(&self) -> Result<Vec<ProviderRecord>, ExtractionError> {
        let rows: Vec<ProviderRow> = sqlx::query_as(
            "SELECT id, provider_type, schema_name, created_timestamp \
             FROM providers \
             WHERE active AND NOT paused \
             ORDER BY created_timestamp",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(catalog_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
