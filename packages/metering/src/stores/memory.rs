//! In-memory implementations for testing and development.
//!
//! Data is lost on restart; not suitable for production.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ExtractionError, ObjectStoreError};
use crate::traits::{ObjectStore, ProviderCatalog, WatermarkStore};
use crate::types::{
    period::BillingPeriod,
    provider::ProviderRecord,
    watermark::Watermark,
};

/// In-memory watermark store keyed by (provider, year, month).
#[derive(Default)]
pub struct MemoryWatermarkStore {
    entries: RwLock<HashMap<(Uuid, i32, u32), DateTime<Utc>>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored timestamp for a key, if any.
    pub fn get(&self, provider_id: Uuid, period: BillingPeriod) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .unwrap()
            .get(&(provider_id, period.year, period.month))
            .copied()
    }

    /// Number of stored watermarks.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn read(
        &self,
        provider_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Option<Watermark>, ExtractionError> {
        Ok(self
            .get(provider_id, period)
            .map(|ts| Watermark::new(provider_id, period, ts)))
    }

    async fn advance(
        &self,
        provider_id: Uuid,
        period: BillingPeriod,
        new_time: DateTime<Utc>,
    ) -> Result<(), ExtractionError> {
        self.entries
            .write()
            .unwrap()
            .insert((provider_id, period.year, period.month), new_time);
        Ok(())
    }
}

/// One object held by [`MemoryObjectStore`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

/// In-memory object store retaining uploaded bodies for assertions.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<Vec<StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of all stored objects, in upload order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap()
            .iter()
            .map(|o| o.key.clone())
            .collect()
    }

    /// Body of the object stored under `key`, if any.
    pub fn body(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.body.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.objects.write().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
        });
        Ok(())
    }
}

/// In-memory provider catalog.
#[derive(Default)]
pub struct MemoryProviderCatalog {
    providers: RwLock<HashMap<Uuid, ProviderRecord>>,
}

impl MemoryProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ProviderRecord) {
        self.providers.write().unwrap().insert(record.id, record);
    }
}

#[async_trait]
impl ProviderCatalog for MemoryProviderCatalog {
    async fn created_at(&self, provider_id: Uuid) -> Result<DateTime<Utc>, ExtractionError> {
        self.providers
            .read()
            .unwrap()
            .get(&provider_id)
            .map(|p| p.created_at)
            .ok_or_else(|| {
                ExtractionError::Catalog(format!("unknown provider {provider_id}").into())
            })
    }

    async fn active_providers(&self) -> Result<Vec<ProviderRecord>, ExtractionError> {
        Ok(self.providers.read().unwrap().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_watermark_upsert_overwrites() {
        let store = MemoryWatermarkStore::new();
        let provider_id = Uuid::new_v4();
        let period = BillingPeriod { year: 2024, month: 3 };
        let first = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();

        assert!(store.read(provider_id, period).await.unwrap().is_none());
        store.advance(provider_id, period, first).await.unwrap();
        store.advance(provider_id, period, second).await.unwrap();

        let watermark = store.read(provider_id, period).await.unwrap().unwrap();
        assert_eq!(watermark.latest_processed_time, second);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_rejects_unknown_provider() {
        let catalog = MemoryProviderCatalog::new();
        let err = catalog.created_at(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Catalog(_)));
    }
}
