//! The analytical query engine seam.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;
use crate::types::page::QueryPage;

/// An opaque tabular data source accepting SQL text.
///
/// The pipeline decides *what* to query; the engine only executes. The
/// `log_ref` labels the statement in logs so slow or failing queries can
/// be traced back to the pipeline phase that issued them.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Execute a statement and return its rows.
    async fn execute(&self, sql: &str, log_ref: &str) -> Result<Vec<Vec<Value>>, EngineError>;

    /// Execute a statement and return rows plus column metadata.
    async fn execute_with_columns(
        &self,
        sql: &str,
        log_ref: &str,
    ) -> Result<QueryPage, EngineError>;
}
