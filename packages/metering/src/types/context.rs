//! Per-run extraction context.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::types::provider::ProviderKind;

/// Immutable descriptor for one extraction run.
///
/// Built once by the caller and passed by reference through the pipeline.
/// Carries the tracing id and structured context attached to every log
/// line the run emits.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub provider_id: Uuid,
    pub provider_kind: ProviderKind,
    /// Tenant schema the provider's line items and watermark live under.
    pub schema: String,
    /// Correlation token for cross-system log correlation.
    pub tracing_id: String,
    /// Structured logging context serialized onto every log line.
    pub log_context: Value,
}

impl ExtractionContext {
    /// Build a run context, rejecting unknown provider types up front.
    pub fn new(
        provider_id: Uuid,
        provider_type: &str,
        schema: impl Into<String>,
        tracing_id: impl Into<String>,
    ) -> Result<Self> {
        let provider_kind = ProviderKind::parse(provider_type)?;
        let schema = schema.into();
        let tracing_id = tracing_id.into();
        let log_context = json!({
            "schema": schema,
            "provider_type": provider_kind.as_str(),
            "provider_uuid": provider_id,
        });
        Ok(Self {
            provider_id,
            provider_kind,
            schema,
            tracing_id,
            log_context,
        })
    }

    /// Extend the structured log context with an extra field.
    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.log_context {
            map.insert(key.to_string(), value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_unknown_provider_type() {
        let result = ExtractionContext::new(Uuid::new_v4(), "Azure", "acct10001", "trace-1");
        assert!(result.is_err());
    }

    #[test]
    fn test_log_context_carries_normalized_type() {
        let ctx = ExtractionContext::new(Uuid::new_v4(), "AWS-local", "acct10001", "trace-1")
            .unwrap();
        assert_eq!(ctx.log_context["provider_type"], "AWS");
        assert_eq!(ctx.log_context["schema"], "acct10001");
    }
}
