//! The extraction pipeline.
//!
//! Control flow for one run: resolve the time window, count matching
//! records, page through them, export each page as a CSV artifact, then
//! advance the watermark once every page has been attempted.

pub mod export;
pub mod orchestrator;
pub mod pager;
pub(crate) mod query;
pub mod window;

pub use export::{ExporterConfig, RecordExporter};
pub use orchestrator::{ExtractorConfig, UsageExtractor};
pub use pager::{pages, BatchPages};
pub use window::WindowResolver;
