use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Bucket exported usage artifacts are uploaded to.
    pub metering_bucket: String,
    pub trino_url: String,
    pub trino_user: String,
    pub trino_catalog: String,
    /// Rows per exported page.
    pub batch_size: u64,
    pub upload_timeout: Duration,
    /// Six-field cron expression driving the extraction sweep.
    pub extraction_schedule: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            metering_bucket: env::var("METERING_BUCKET")
                .context("METERING_BUCKET must be set")?,
            trino_url: env::var("TRINO_URL").context("TRINO_URL must be set")?,
            trino_user: env::var("TRINO_USER").unwrap_or_else(|_| "metering".to_string()),
            trino_catalog: env::var("TRINO_CATALOG").unwrap_or_else(|_| "hive".to_string()),
            batch_size: env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "200000".to_string())
                .parse()
                .context("BATCH_SIZE must be a valid number")?,
            upload_timeout: Duration::from_secs(
                env::var("UPLOAD_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .context("UPLOAD_TIMEOUT_SECS must be a valid number")?,
            ),
            extraction_schedule: env::var("EXTRACTION_SCHEDULE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string()),
        })
    }
}
