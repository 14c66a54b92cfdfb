//! Trino statement-protocol client.
//!
//! Submits SQL to `/v1/statement` and follows `nextUri` until the result
//! set is drained, accumulating rows and column metadata.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::EngineError;
use crate::traits::QueryEngine;
use crate::types::page::{ColumnMeta, QueryPage};

#[derive(Debug, Deserialize)]
struct StatementResponse {
    columns: Option<Vec<TrinoColumn>>,
    data: Option<Vec<Vec<Value>>>,
    #[serde(rename = "nextUri")]
    next_uri: Option<String>,
    error: Option<TrinoError>,
}

#[derive(Debug, Deserialize)]
struct TrinoColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[derive(Debug, Deserialize)]
struct TrinoError {
    message: String,
    #[serde(rename = "errorName")]
    error_name: Option<String>,
}

/// A [`QueryEngine`] backed by a Trino coordinator.
pub struct TrinoQueryEngine {
    http: Client,
    base_url: Url,
    user: String,
    catalog: String,
}

impl TrinoQueryEngine {
    pub fn new(base_url: Url, user: impl Into<String>, catalog: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            user: user.into(),
            catalog: catalog.into(),
        }
    }

    async fn query(&self, sql: &str, log_ref: &str) -> Result<QueryPage, EngineError> {
        let statement_url = self
            .base_url
            .join("v1/statement")
            .map_err(|e| EngineError::Decode(format!("bad coordinator url: {e}")))?;

        debug!(log_ref, "submitting statement to trino");
        let mut response: StatementResponse = self
            .http
            .post(statement_url)
            .header("X-Trino-User", &self.user)
            .header("X-Trino-Catalog", &self.catalog)
            .body(sql.to_string())
            .send()
            .await
            .map_err(transport_err)?
            .error_for_status()
            .map_err(transport_err)?
            .json()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        let mut columns: Vec<ColumnMeta> = Vec::new();
        let mut rows: Vec<Vec<Value>> = Vec::new();
        loop {
            if let Some(error) = response.error {
                let name = error.error_name.unwrap_or_default();
                return Err(EngineError::Query {
                    message: format!("{name}: {}", error.message),
                });
            }
            if columns.is_empty() {
                if let Some(cols) = response.columns {
                    columns = cols.into_iter().map(column_meta).collect();
                }
            }
            if let Some(mut data) = response.data {
                rows.append(&mut data);
            }
            let Some(next) = response.next_uri else {
                break;
            };
            response = self
                .http
                .get(next.as_str())
                .header("X-Trino-User", &self.user)
                .send()
                .await
                .map_err(transport_err)?
                .error_for_status()
                .map_err(transport_err)?
                .json()
                .await
                .map_err(|e| EngineError::Decode(e.to_string()))?;
        }

        Ok(QueryPage::new(columns, rows))
    }
}

fn transport_err(err: reqwest::Error) -> EngineError {
    EngineError::Connectivity(Box::new(err))
}

fn column_meta(col: TrinoColumn) -> ColumnMeta {
    ColumnMeta {
        name: col.name,
        type_code: Some(col.type_name),
        display_size: None,
        internal_size: None,
        precision: None,
        scale: None,
        nullable: None,
    }
}

#[async_trait]
impl QueryEngine for TrinoQueryEngine {
    async fn execute(&self, sql: &str, log_ref: &str) -> Result<Vec<Vec<Value>>, EngineError> {
        Ok(self.query(sql, log_ref).await?.rows)
    }

    async fn execute_with_columns(
        &self,
        sql: &str,
        log_ref: &str,
    ) -> Result<QueryPage, EngineError> {
        self.query(sql, log_ref).await
    }
}
