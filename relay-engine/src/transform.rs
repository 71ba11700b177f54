//! Output format transforms
//!
//! A transform turns the stored JSON response into the representation a
//! caller asked for. The engine ships a JSON passthrough; richer
//! renderings (CSV, TSV, DataTable) register their own implementations
//! at wiring time. When a transform fails, the read path serves the
//! untransformed JSON instead of failing the request.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use relay_core::format::OutputFormat;

#[derive(Debug, Clone, Error)]
#[error("transform failed: {reason}")]
pub struct TransformError {
    pub reason: String,
}

impl TransformError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub trait Transform: Send + Sync {
    fn transform(&self, content: &Value) -> Result<Value, TransformError>;
}

/// Identity transform for the default JSON format.
pub struct JsonPassthrough;

impl Transform for JsonPassthrough {
    fn transform(&self, content: &Value) -> Result<Value, TransformError> {
        Ok(content.clone())
    }
}

/// Maps output formats to their transforms. Unregistered formats fall
/// back to the JSON passthrough so every format is always servable.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<OutputFormat, Arc<dyn Transform>>,
    fallback: Arc<dyn Transform>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
            fallback: Arc::new(JsonPassthrough),
        }
    }

    pub fn register(&mut self, format: OutputFormat, transform: Arc<dyn Transform>) {
        self.transforms.insert(format, transform);
    }

    pub fn get(&self, format: OutputFormat) -> Arc<dyn Transform> {
        self.transforms
            .get(&format)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    impl Transform for Upper {
        fn transform(&self, content: &Value) -> Result<Value, TransformError> {
            Ok(json!(content.to_string().to_uppercase()))
        }
    }

    #[test]
    fn test_unregistered_format_uses_passthrough() {
        let registry = TransformRegistry::new();
        let content = json!({"rows": [[1]]});
        let out = registry.get(OutputFormat::Csv).transform(&content).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn test_registered_transform_is_used() {
        let mut registry = TransformRegistry::new();
        registry.register(OutputFormat::Csv, Arc::new(Upper));
        let out = registry
            .get(OutputFormat::Csv)
            .transform(&json!("abc"))
            .unwrap();
        assert_eq!(out, json!("\"ABC\""));
    }
}
