//! Watermark-Tracked Usage Extraction Library
//!
//! Pulls usage line items for a cloud provider out of an analytical SQL
//! engine in bounded batches, exports each batch as a CSV artifact to
//! object storage, and tracks a per-(provider, year, month) watermark so
//! repeated runs only process newly-landed data.
//!
//! # Design
//!
//! - Trait seams for every external collaborator (query engine, object
//!   store, watermark store, provider catalog), injected at construction
//! - A run either completes its page loop and advances the watermark, or
//!   fails before the loop and leaves state untouched
//! - Per-page upload failures are absorbed and logged; the run continues
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use metering::{
//!     ExporterConfig, ExtractionContext, ExtractorConfig, RecordExporter, UsageExtractor,
//! };
//!
//! let exporter = RecordExporter::new(object_store, ExporterConfig::new("metering-bucket"));
//! let extractor = UsageExtractor::new(
//!     engine,
//!     watermarks,
//!     catalog,
//!     exporter,
//!     ExtractorConfig::default(),
//! );
//!
//! let ctx = ExtractionContext::new(provider_id, "AWS", "acct10001", tracing_id)?;
//! let uploaded = extractor.run(&ctx, period_start).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (QueryEngine, ObjectStore, WatermarkStore, ProviderCatalog)
//! - [`types`] - Domain types (context, watermark, periods, pages)
//! - [`pipeline`] - Window resolution, paging, export, orchestration
//! - [`stores`] - Storage implementations (memory, Postgres)
//! - [`engines`] - Query engine implementations (Trino)
//! - [`object_stores`] - Object store implementations (S3)
//! - [`testing`] - Mock implementations for testing

pub mod engines;
pub mod error;
pub mod object_stores;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{EngineError, ExtractionError, ObjectStoreError, Result};
pub use traits::{ObjectStore, ProviderCatalog, QueryEngine, WatermarkStore};
pub use types::{
    BillingPeriod, ColumnMeta, ExtractionContext, PageDescriptor, ProviderKind, ProviderRecord,
    QueryPage, Watermark,
};

// Re-export pipeline components
pub use pipeline::{
    pages, BatchPages, ExporterConfig, ExtractorConfig, RecordExporter, UsageExtractor,
    WindowResolver,
};

// Re-export stores
pub use stores::{MemoryObjectStore, MemoryProviderCatalog, MemoryWatermarkStore};

#[cfg(feature = "postgres")]
pub use stores::{PostgresProviderCatalog, PostgresWatermarkStore};

#[cfg(feature = "trino")]
pub use engines::TrinoQueryEngine;

#[cfg(feature = "s3")]
pub use object_stores::S3ObjectStore;
