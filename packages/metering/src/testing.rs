//! Testing utilities including mock implementations.
//!
//! Useful for exercising the pipeline without a live query engine or
//! object store.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::{EngineError, ObjectStoreError};
use crate::pipeline::orchestrator::{COUNT_LOG_REF, LATEST_USAGE_LOG_REF};
use crate::stores::memory::MemoryObjectStore;
use crate::traits::{ObjectStore, QueryEngine};
use crate::types::page::{ColumnMeta, QueryPage};

/// Record of a statement the mock engine was asked to run.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub sql: String,
    pub log_ref: String,
}

/// A mock query engine with canned scalar and page responses.
#[derive(Default)]
pub struct MockQueryEngine {
    latest_usage_time: Option<DateTime<Utc>>,
    count: u64,
    rows_per_page: usize,
    fail_all: bool,
    calls: RwLock<Vec<RecordedQuery>>,
}

impl MockQueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose every statement fails with a connectivity error.
    pub fn unreachable() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Set the MAX(usage_start) scalar the engine reports.
    pub fn with_latest_usage_time(mut self, ts: DateTime<Utc>) -> Self {
        self.latest_usage_time = Some(ts);
        self
    }

    /// Set the matching-record count the engine reports.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Set how many rows each fetched page carries.
    pub fn with_page_rows(mut self, rows: usize) -> Self {
        self.rows_per_page = rows;
        self
    }

    /// Statements executed so far, in order.
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, sql: &str, log_ref: &str) -> Result<(), EngineError> {
        if self.fail_all {
            return Err(EngineError::Connectivity(
                "mock engine is unreachable".into(),
            ));
        }
        self.calls.write().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            log_ref: log_ref.to_string(),
        });
        Ok(())
    }

    fn sample_page(&self) -> QueryPage {
        let rows = (0..self.rows_per_page)
            .map(|i| {
                vec![
                    json!(format!("2024-03-01 {:02}:00:00", i % 24)),
                    json!(4),
                    json!("i-instance"),
                ]
            })
            .collect();
        QueryPage::new(
            vec![
                ColumnMeta::named("lineitem_usagestartdate"),
                ColumnMeta::named("product_vcpu"),
                ColumnMeta::named("lineitem_resourceid"),
            ],
            rows,
        )
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn execute(&self, sql: &str, log_ref: &str) -> Result<Vec<Vec<Value>>, EngineError> {
        self.record(sql, log_ref)?;
        match log_ref {
            LATEST_USAGE_LOG_REF => {
                let value = match self.latest_usage_time {
                    Some(ts) => json!(ts.to_rfc3339()),
                    None => Value::Null,
                };
                Ok(vec![vec![value]])
            }
            COUNT_LOG_REF => Ok(vec![vec![json!(self.count)]]),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute_with_columns(
        &self,
        sql: &str,
        log_ref: &str,
    ) -> Result<QueryPage, EngineError> {
        self.record(sql, log_ref)?;
        Ok(self.sample_page())
    }
}

/// An object store that fails uploads whose key matches a pattern,
/// recording every attempt.
pub struct FlakyObjectStore {
    inner: MemoryObjectStore,
    fail_patterns: HashSet<String>,
    attempts: RwLock<Vec<String>>,
}

impl FlakyObjectStore {
    /// Fail any put whose key contains one of the given patterns.
    pub fn failing_on<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: MemoryObjectStore::new(),
            fail_patterns: patterns.into_iter().map(Into::into).collect(),
            attempts: RwLock::new(Vec::new()),
        }
    }

    /// Keys attempted so far, successful or not, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.read().unwrap().clone()
    }

    /// Keys of uploads that succeeded.
    pub fn stored_keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[async_trait]
impl ObjectStore for FlakyObjectStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), ObjectStoreError> {
        self.attempts.write().unwrap().push(key.to_string());
        if self.fail_patterns.iter().any(|p| key.contains(p)) {
            return Err(ObjectStoreError::Connectivity(
                format!("simulated endpoint failure for {key}").into(),
            ));
        }
        self.inner.put(bucket, key, body).await
    }
}
