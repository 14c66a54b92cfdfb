//! CSV export of query pages to object storage.

use std::borrow::Cow;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::ObjectStore;
use crate::types::{context::ExtractionContext, page::QueryPage};

/// Exporter settings for one deployment.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Destination bucket for exported artifacts.
    pub bucket: String,
    /// Upper bound on a single page upload. An unbounded network call
    /// would stall the sequential page loop indefinitely.
    pub upload_timeout: Duration,
}

impl ExporterConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            upload_timeout: Duration::from_secs(600),
        }
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }
}

/// Serializes one page of results to CSV and uploads it.
pub struct RecordExporter {
    store: Arc<dyn ObjectStore>,
    config: ExporterConfig,
}

impl RecordExporter {
    pub fn new(store: Arc<dyn ObjectStore>, config: ExporterConfig) -> Self {
        Self { store, config }
    }

    /// Object-key prefix for the run's artifacts:
    /// `{schema}/{provider_type}/source={provider_id}/date={today}`.
    pub fn object_prefix(&self, ctx: &ExtractionContext) -> String {
        format!(
            "{}/{}/source={}/date={}",
            ctx.schema,
            ctx.provider_kind.as_str(),
            ctx.provider_id,
            Utc::now().date_naive(),
        )
    }

    /// Export one page under the given filename.
    ///
    /// Serialization failures propagate; upload failures (connectivity or
    /// service-side) are logged and absorbed so the remaining pages of
    /// the run still execute. Returns the object key on success, `None`
    /// for a skipped page. The local artifact lives in a named temp file
    /// and is removed on every exit path.
    pub async fn export(
        &self,
        ctx: &ExtractionContext,
        page: &QueryPage,
        filename: &str,
    ) -> Result<Option<String>> {
        let artifact = NamedTempFile::new()?;
        write_csv(page, artifact.as_file())?;
        let body = std::fs::read(artifact.path())?;

        let key = format!("{}/{}", self.object_prefix(ctx), filename);
        let upload = self
            .store
            .put(&self.config.bucket, &key, body);
        match tokio::time::timeout(self.config.upload_timeout, upload).await {
            Ok(Ok(())) => {
                debug!(
                    tracing_id = %ctx.tracing_id,
                    context = %ctx.log_context,
                    key,
                    "uploaded export artifact"
                );
                Ok(Some(key))
            }
            Ok(Err(err)) => {
                warn!(
                    tracing_id = %ctx.tracing_id,
                    context = %ctx.log_context,
                    error = %err,
                    "unable to copy data to {key}, bucket {}",
                    self.config.bucket,
                );
                Ok(None)
            }
            Err(_) => {
                warn!(
                    tracing_id = %ctx.tracing_id,
                    context = %ctx.log_context,
                    timeout_secs = self.config.upload_timeout.as_secs(),
                    "upload of {key} timed out"
                );
                Ok(None)
            }
        }
    }
}

/// Render an engine value the way it arrived: strings verbatim, nulls
/// empty, everything else in its JSON textual form.
fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

fn write_csv<W: Write>(page: &QueryPage, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(page.column_names())?;
    for row in &page.rows {
        writer.write_record(row.iter().map(|v| render_value(v).into_owned()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    use crate::stores::memory::MemoryObjectStore;
    use crate::types::page::ColumnMeta;

    fn sample_page() -> QueryPage {
        QueryPage::new(
            vec![
                ColumnMeta::named("usage_start"),
                ColumnMeta::named("vcpu"),
                ColumnMeta::named("note"),
            ],
            vec![
                vec![json!("2024-03-01 00:00:00"), json!(4), json!(null)],
                vec![json!("2024-03-01 01:00:00"), json!(8), json!("spot")],
            ],
        )
    }

    fn context() -> ExtractionContext {
        ExtractionContext::new(Uuid::nil(), "AWS", "acct10001", "trace-1").unwrap()
    }

    #[test]
    fn test_csv_preserves_header_and_row_order() {
        let mut buf = Vec::new();
        write_csv(&sample_page(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("usage_start,vcpu,note"));
        assert_eq!(lines.next(), Some("2024-03-01 00:00:00,4,"));
        assert_eq!(lines.next(), Some("2024-03-01 01:00:00,8,spot"));
    }

    #[tokio::test]
    async fn test_export_returns_deterministic_key() {
        let store = Arc::new(MemoryObjectStore::new());
        let exporter = RecordExporter::new(store.clone(), ExporterConfig::new("metering-bucket"));
        let ctx = context();

        let key_a = exporter
            .export(&ctx, &sample_page(), "usage_trace-1_0.csv")
            .await
            .unwrap()
            .unwrap();
        let key_b = exporter
            .export(&ctx, &sample_page(), "usage_trace-1_1.csv")
            .await
            .unwrap()
            .unwrap();

        let prefix = exporter.object_prefix(&ctx);
        assert!(key_a.starts_with(&prefix));
        assert!(key_b.starts_with(&prefix));
        assert!(key_a.ends_with("usage_trace-1_0.csv"));
        assert!(key_b.ends_with("usage_trace-1_1.csv"));
        assert_eq!(store.keys().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_is_absorbed() {
        use crate::testing::FlakyObjectStore;

        let store = Arc::new(FlakyObjectStore::failing_on(["usage_trace-1_0.csv"]));
        let exporter = RecordExporter::new(store.clone(), ExporterConfig::new("metering-bucket"));
        let ctx = context();

        let skipped = exporter
            .export(&ctx, &sample_page(), "usage_trace-1_0.csv")
            .await
            .unwrap();
        assert!(skipped.is_none());
        assert_eq!(store.attempts().len(), 1);
    }
}
