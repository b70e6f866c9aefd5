// Tool trait and the process-wide registry

use crate::protocol::{CallToolResult, ToolSchema};
use crate::schema::{Arguments, InputSchema};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Static description of a tool: what `tools/list` advertises and what
/// `tools/call` arguments are validated against.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Wire form for `tools/list`
    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json(),
        }
    }
}

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Run with already-validated arguments.
    ///
    /// Domain failures (backend down, bad URL) come back as an error-flagged
    /// `CallToolResult`; `Err` is reserved for internal faults.
    async fn execute(&self, arguments: Arguments) -> Result<CallToolResult>;
}

/// Tool registry, read-only once the server starts
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a tool; a later registration under the same name replaces the earlier one
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name.clone();
        match self.by_name.get(&name) {
            Some(&index) => self.tools[index] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name.get(name).map(|&i| self.tools[i].clone())
    }

    /// List all tool schemas in registration order
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.descriptor().schema()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolContent;
    use crate::schema::ParamSpec;

    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new(name: &str, description: &str) -> Self {
            Self {
                descriptor: ToolDescriptor::new(
                    name,
                    description,
                    InputSchema::new(vec![ParamSpec::string("text", "Text to echo").required()]),
                ),
            }
        }
    }

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, arguments: Arguments) -> Result<CallToolResult> {
            let text = arguments.str("text").unwrap_or_default().to_string();
            Ok(CallToolResult::success(vec![ToolContent::text(text)]))
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("b", "second")));
        registry.register(Arc::new(EchoTool::new("a", "first")));

        let names: Vec<String> = registry.list_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(registry.contains("a"));
        assert!(!registry.contains("c"));
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo", "old")));
        registry.register(Arc::new(EchoTool::new("echo", "new")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().descriptor().description, "new");
    }

    #[tokio::test]
    async fn test_execute_through_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo", "Echo")));

        let tool = registry.get("echo").unwrap();
        let args = tool
            .descriptor()
            .input_schema
            .validate(&serde_json::json!({"text": "hi"}))
            .unwrap();
        let result = tool.execute(args).await.unwrap();
        assert_eq!(result.text(), "hi");
    }
}
