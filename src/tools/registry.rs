//! Tool registry for managing available tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::tools::tool::{self, Tool};

/// Registry of available tools.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool, replacing any tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.write().await.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replaced existing tool registration");
        }
        tracing::debug!("Registered tool: {}", name);
    }

    /// Register a tool (sync version for startup).
    pub fn register_sync(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Ok(mut tools) = self.tools.try_write() {
            tools.insert(name.clone(), tool);
            tracing::debug!("Registered tool: {}", name);
        }
    }

    /// Get a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Check if a tool exists.
    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// List all tool names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered tools.
    pub fn count(&self) -> usize {
        self.tools.try_read().map(|t| t.len()).unwrap_or(0)
    }

    /// Get tool definitions for LLM function calling, sorted by name.
    pub async fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .read()
            .await
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Invoke a tool by name with an arguments object.
    ///
    /// Returns the tool's result rendered as text.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<String, ToolError> {
        let tool = self.get(name).await.ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;

        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments {
                name: name.to_string(),
                reason: "arguments must be a JSON object".to_string(),
            });
        }

        tracing::debug!(tool = %name, params = %arguments, "Tool call started");

        let timeout = tool.execution_timeout();
        let start = Instant::now();
        let result = tokio::time::timeout(timeout, tool.execute(arguments.clone()))
            .await
            .map_err(|_| ToolError::ExecutionFailed {
                name: name.to_string(),
                reason: format!("timed out after {timeout:?}"),
            })?;

        match result {
            Ok(output) => {
                tracing::debug!(
                    tool = %name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                Ok(output.as_text())
            }
            Err(e) => {
                tracing::debug!(
                    tool = %name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Tool call failed"
                );
                Err(match e {
                    tool::ToolError::InvalidParameters(reason) => ToolError::InvalidArguments {
                        name: name.to_string(),
                        reason,
                    },
                    tool::ToolError::ExecutionFailed(reason) => ToolError::ExecutionFailed {
                        name: name.to_string(),
                        reason,
                    },
                })
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
