//! Provider kinds supported by the extraction pipeline.
//!
//! Kinds form a closed enum mapped to a static table of query targets.
//! Unknown provider type strings are rejected when the run context is
//! built, not when the first query executes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExtractionError;

/// A cloud provider whose usage line items can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Amazon Web Services cost and usage reports
    Aws,
}

impl ProviderKind {
    /// Parse a provider type label, normalizing development `-local`
    /// variants into their real kind.
    pub fn parse(value: &str) -> Result<Self, ExtractionError> {
        let normalized = value.strip_suffix("-local").unwrap_or(value);
        match normalized {
            "AWS" => Ok(Self::Aws),
            _ => Err(ExtractionError::UnsupportedProviderType {
                value: value.to_string(),
            }),
        }
    }

    /// Canonical label, used in object keys and log context.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "AWS",
        }
    }

    /// The line-item table this kind's usage records live in.
    pub fn line_item_table(&self) -> &'static str {
        match self {
            Self::Aws => "aws_line_items",
        }
    }

    /// Column holding the usage interval start for this kind.
    pub fn usage_start_column(&self) -> &'static str {
        match self {
            Self::Aws => "lineitem_usagestartdate",
        }
    }

    /// Predicate restricting the table to meterable usage records.
    ///
    /// Metered records are EC2 usage line items carrying vCPU product
    /// data and a Red Hat subscription resource tag.
    pub fn eligibility_predicate(&self) -> &'static str {
        match self {
            Self::Aws => {
                "lineitem_productcode = 'AmazonEC2' \
                 AND lineitem_lineitemtype IN ('Usage', 'SavingsPlanCoveredUsage') \
                 AND product_vcpu IS NOT NULL \
                 AND strpos(resourcetags, 'com_redhat_rhel') > 0"
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider row as enumerated from the catalog.
#[derive(Debug, Clone)]
pub struct ProviderRecord {
    pub id: Uuid,
    /// Raw provider type label as stored, possibly `-local` suffixed.
    pub provider_type: String,
    /// Tenant schema the provider's data lives under.
    pub schema: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_local_suffix() {
        assert_eq!(ProviderKind::parse("AWS").unwrap(), ProviderKind::Aws);
        assert_eq!(ProviderKind::parse("AWS-local").unwrap(), ProviderKind::Aws);
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = ProviderKind::parse("GCP").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::UnsupportedProviderType { value } if value == "GCP"
        ));
    }

    #[test]
    fn test_table_mapping() {
        assert_eq!(ProviderKind::Aws.line_item_table(), "aws_line_items");
    }
}
