//! Typed errors for the metering library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during an extraction run.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Query engine failed
    #[error("query engine error: {0}")]
    Engine(#[from] EngineError),

    /// Watermark persistence failed
    #[error("watermark storage error: {0}")]
    Watermark(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Provider catalog lookup failed
    #[error("provider catalog error: {0}")]
    Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Provider type is not one the pipeline knows how to extract
    #[error("unsupported provider type: {value}")]
    UnsupportedProviderType { value: String },

    /// Unexpected shape in a scalar query result
    #[error("malformed query result for {log_ref}: {reason}")]
    MalformedResult { log_ref: &'static str, reason: String },

    /// CSV serialization failed
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// Local artifact I/O failed
    #[error("export artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by a query engine backend.
///
/// Connectivity failures and query failures propagate out of a run before
/// any watermark mutation, so a retry starts from consistent state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine unreachable
    #[error("engine unreachable: {0}")]
    Connectivity(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Engine rejected or failed the query
    #[error("query failed: {message}")]
    Query { message: String },

    /// Response could not be decoded
    #[error("malformed engine response: {0}")]
    Decode(String),
}

/// Errors surfaced by an object store backend.
///
/// These are absorbed per page by the exporter: a failed upload skips the
/// page and the run continues.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Store endpoint unreachable
    #[error("object store unreachable: {0}")]
    Connectivity(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Store rejected the request
    #[error("object store request failed: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
