// Tool execution with per-call deadlines

use crate::protocol::CallToolResult;
use crate::schema::SchemaViolation;
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Failures that happen before a tool gets to run; these become JSON-RPC errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidArguments(#[from] SchemaViolation),

    #[error("Tool execution failed: {0}")]
    Internal(String),
}

/// Looks up, validates and runs tools under a deadline.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run `name` with raw `arguments`.
    ///
    /// When the deadline passes the in-flight backend call is dropped and a
    /// timeout error block is returned instead.
    pub async fn execute(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<CallToolResult, ToolCallError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;
        let arguments = tool.descriptor().input_schema.validate(arguments)?;

        tracing::info!(tool = %name, "Executing tool");
        let started = Instant::now();

        match tokio::time::timeout(self.timeout, tool.execute(arguments)).await {
            Ok(Ok(result)) => {
                tracing::info!(
                    tool = %name,
                    is_error = result.is_error,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool finished"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                tracing::error!(tool = %name, error = %e, "Tool failed internally");
                Err(ToolCallError::Internal(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(tool = %name, timeout_secs = self.timeout.as_secs_f64(), "Tool timed out");
                Ok(CallToolResult::error(format!(
                    "{} timed out after {:.1}s",
                    name,
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::default_registry;
    use searxng_core::backend::MockBackend;
    use searxng_core::{EngineConfig, HtmlExtractor};
    use serde_json::json;

    fn executor(backend: Arc<MockBackend>, timeout: Duration) -> ToolExecutor {
        let registry = default_registry(backend, Arc::new(HtmlExtractor), &EngineConfig::default());
        ToolExecutor::new(Arc::new(registry), timeout)
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let exec = executor(Arc::new(MockBackend::new()), Duration::from_secs(1));
        let err = exec.execute("nope", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_backend() {
        let backend = Arc::new(MockBackend::new());
        let exec = executor(backend.clone(), Duration::from_secs(1));

        let err = exec
            .execute("web_search", &json!({"max_results": 5}))
            .await
            .unwrap_err();
        match err {
            ToolCallError::InvalidArguments(v) => assert_eq!(v.field, "query"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_returns_timeout_block() {
        let backend = Arc::new(MockBackend::new());
        backend.set_delay(Duration::from_secs(60));
        let exec = executor(backend, Duration::from_secs(2));

        let result = exec
            .execute("web_search", &json!({"query": "slow"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.text(), "Error: web_search timed out after 2.0s");
    }
}
