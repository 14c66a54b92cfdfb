//! Query engine implementations.

#[cfg(feature = "trino")]
pub mod trino;

#[cfg(feature = "trino")]
pub use trino::TrinoQueryEngine;
