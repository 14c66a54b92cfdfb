//! Storage implementations behind the pipeline's trait seams.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{MemoryObjectStore, MemoryProviderCatalog, MemoryWatermarkStore};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresProviderCatalog, PostgresWatermarkStore};
