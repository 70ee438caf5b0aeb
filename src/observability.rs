//! Correlation ids for launch operations
//!
//! A launch run opens a root [`TraceContext`] and runs each stage under a
//! child of it; bundle submissions open their own root. The ids are
//! attached to the tracing span so every log line of that operation can
//! be grouped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID shared by all spans of one launch run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trace/span ids for one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub correlation_id: CorrelationId,
    pub parent_span_id: Option<String>,
    pub operation: String,
    /// Creation time, Unix epoch seconds
    pub timestamp: i64,
}

impl TraceContext {
    /// Create a root context for an operation
    pub fn new(operation: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: CorrelationId::new(),
            parent_span_id: None,
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Create a child span that keeps the trace and correlation ids
    pub fn child_span(&self, operation: &str) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: self.correlation_id.clone(),
            parent_span_id: Some(self.span_id.clone()),
            operation: operation.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Tracing span carrying this context's ids
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "op",
            operation = %self.operation,
            trace_id = %self.trace_id,
            span_id = %self.span_id,
            correlation_id = %self.correlation_id,
        )
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new("launch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_span_inherits_trace() {
        let root = TraceContext::new("launch");
        let child = root.child_span("submit_bundle");

        assert_eq!(child.trace_id, root.trace_id);
        assert_eq!(child.correlation_id, root.correlation_id);
        assert_eq!(child.parent_span_id.as_deref(), Some(root.span_id.as_str()));
        assert_ne!(child.span_id, root.span_id);
        assert_eq!(child.operation, "submit_bundle");
    }

    #[test]
    fn test_roots_are_distinct() {
        let a = TraceContext::new("a");
        let b = TraceContext::new("b");
        assert_ne!(a.trace_id, b.trace_id);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
