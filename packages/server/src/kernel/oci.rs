//! Oracle Cloud Infrastructure billing-bucket reachability check.
//!
//! Validates that a provider's data source names a bucket, namespace,
//! and region, then confirms cost and usage reports are actually
//! listable in that bucket. The listing call goes through a narrow
//! probe trait so tests substitute a fake.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Data-source fields supplied when an OCI provider is registered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OciDataSource {
    pub bucket: Option<String>,
    pub bucket_namespace: Option<String>,
    pub bucket_region: Option<String>,
}

/// Validation failures for an OCI data source.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bucket is a required parameter for OCI")]
    BucketMissing,

    #[error("bucket_namespace is a required parameter for OCI")]
    NamespaceMissing,

    #[error("bucket_region is a required parameter for OCI")]
    RegionMissing,

    #[error("unable to obtain cost and usage reports with bucket {bucket}, namespace {namespace}, region {region}")]
    NoReportFound {
        bucket: String,
        namespace: String,
        region: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Lists objects in an OCI object-storage bucket.
#[async_trait]
pub trait BucketProbe: Send + Sync {
    async fn list_objects(
        &self,
        namespace: &str,
        bucket: &str,
        region: &str,
    ) -> anyhow::Result<()>;
}

/// Probe backed by the OCI object-storage REST endpoint.
pub struct OciObjectStorageProbe {
    http: reqwest::Client,
}

impl Default for OciObjectStorageProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl OciObjectStorageProbe {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BucketProbe for OciObjectStorageProbe {
    async fn list_objects(
        &self,
        namespace: &str,
        bucket: &str,
        region: &str,
    ) -> anyhow::Result<()> {
        let url = format!(
            "https://objectstorage.{region}.oraclecloud.com/n/{namespace}/b/{bucket}/o?limit=1"
        );
        self.http
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// The OCI provider connectivity interface.
pub struct OciProvider<P: BucketProbe> {
    probe: P,
}

impl Default for OciProvider<OciObjectStorageProbe> {
    fn default() -> Self {
        Self::new(OciObjectStorageProbe::new())
    }
}

impl<P: BucketProbe> OciProvider<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// Provider type label.
    pub fn name(&self) -> &'static str {
        "OCI"
    }

    /// Verify that the cost-report bucket exists and is reachable.
    pub async fn cost_usage_source_is_reachable(
        &self,
        data_source: &OciDataSource,
    ) -> Result<(), ValidationError> {
        let bucket = require(&data_source.bucket).ok_or(ValidationError::BucketMissing)?;
        let namespace =
            require(&data_source.bucket_namespace).ok_or(ValidationError::NamespaceMissing)?;
        let region = require(&data_source.bucket_region).ok_or(ValidationError::RegionMissing)?;

        if let Err(err) = self.probe.list_objects(namespace, bucket, region).await {
            warn!(
                bucket,
                namespace,
                region,
                error = %err,
                "unable to list cost and usage reports"
            );
            return Err(ValidationError::NoReportFound {
                bucket: bucket.to_string(),
                namespace: namespace.to_string(),
                region: region.to_string(),
                source: err,
            });
        }
        Ok(())
    }
}

fn require(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProbe {
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn ok() -> Self {
            Self { fail: false, calls: AtomicUsize::new(0) }
        }

        fn failing() -> Self {
            Self { fail: true, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl BucketProbe for FakeProbe {
        async fn list_objects(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    fn source(bucket: &str, namespace: &str, region: &str) -> OciDataSource {
        OciDataSource {
            bucket: Some(bucket.to_string()),
            bucket_namespace: Some(namespace.to_string()),
            bucket_region: Some(region.to_string()),
        }
    }

    #[tokio::test]
    async fn test_missing_fields_fail_before_probe() {
        let provider = OciProvider::new(FakeProbe::ok());

        let err = provider
            .cost_usage_source_is_reachable(&OciDataSource::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::BucketMissing));

        let err = provider
            .cost_usage_source_is_reachable(&source("reports", "   ", "us-ashburn-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::NamespaceMissing));

        let err = provider
            .cost_usage_source_is_reachable(&source("reports", "ns", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::RegionMissing));

        assert_eq!(provider.probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_bucket_maps_to_no_report_found() {
        let provider = OciProvider::new(FakeProbe::failing());
        let err = provider
            .cost_usage_source_is_reachable(&source("reports", "ns", "us-ashburn-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::NoReportFound { .. }));
    }

    #[tokio::test]
    async fn test_reachable_bucket_passes() {
        let provider = OciProvider::new(FakeProbe::ok());
        provider
            .cost_usage_source_is_reachable(&source("reports", "ns", "us-ashburn-1"))
            .await
            .unwrap();
        assert_eq!(provider.probe.calls.load(Ordering::SeqCst), 1);
    }
}
