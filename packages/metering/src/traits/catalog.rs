//! The provider catalog seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::types::provider::ProviderRecord;

/// Read access to the provider registry.
#[async_trait]
pub trait ProviderCatalog: Send + Sync {
    /// When the provider was created. Used as the lower clamp for the
    /// extraction window.
    async fn created_at(&self, provider_id: Uuid) -> Result<DateTime<Utc>, ExtractionError>;

    /// All providers currently eligible for extraction.
    async fn active_providers(&self) -> Result<Vec<ProviderRecord>, ExtractionError>;
}
