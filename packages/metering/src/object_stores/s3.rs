//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::error::ObjectStoreError;
use crate::traits::ObjectStore;

/// An [`ObjectStore`] over an S3-compatible bucket service.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS environment (credentials,
    /// region, endpoint overrides).
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| {
                if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
                    ObjectStoreError::Connectivity(Box::new(err))
                } else {
                    ObjectStoreError::Service(Box::new(err))
                }
            })
    }
}
