//! The object store seam.

use async_trait::async_trait;

use crate::error::ObjectStoreError;

/// A bucket-addressed blob store.
///
/// No partial-object or multipart contract is required at this layer;
/// each exported page is one bounded `put`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` in `bucket`.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), ObjectStoreError>;
}
