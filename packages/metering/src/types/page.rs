//! Transient paging and result-set types.

use serde_json::Value;

/// One bounded slice of a larger result set.
///
/// The index is the zero-based position in the page sequence and only
/// feeds output filename determinism; offsets drive correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDescriptor {
    pub index: usize,
    pub offset: u64,
    pub limit: u64,
}

/// Column metadata as reported by the query engine.
///
/// The format mirrors a DB-API description tuple: name, type code,
/// display size, internal size, precision, scale, nullability. Only the
/// name is consumed downstream; the rest is carried for completeness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_code: Option<String>,
    pub display_size: Option<u32>,
    pub internal_size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: Option<bool>,
}

impl ColumnMeta {
    /// A column known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code: None,
            display_size: None,
            internal_size: None,
            precision: None,
            scale: None,
            nullable: None,
        }
    }
}

/// One page of query results: ordered rows plus ordered column metadata.
///
/// Produced by the query engine, consumed once by the exporter, then
/// discarded. Row and column order are preserved exactly as returned.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryPage {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Column names in engine order, used as the CSV header.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_names_preserve_order() {
        let page = QueryPage::new(
            vec![ColumnMeta::named("usage_start"), ColumnMeta::named("vcpu")],
            vec![vec![json!("2024-03-01"), json!(4)]],
        );
        assert_eq!(page.column_names(), vec!["usage_start", "vcpu"]);
        assert!(!page.is_empty());
    }
}
