//! Lookup tool system
//!
//! Tools are small deterministic lookups over the [`Repository`]. Each one
//! publishes a JSON schema for its parameters; the [`ToolSystem`] validates
//! every call against that schema before executing it, whether the call came
//! from the completion service or from the HTTP tool console.
//!
//! Lookup failures (unknown customer, bad id format, ...) are *results*, not
//! errors: they are rendered as tagged JSON so the model can read them.
//! [`ToolError`] is reserved for calls that never reached a lookup.
//!
//! [`Repository`]: crate::data::Repository

use crate::data::Repository;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod builtin;
pub mod outcome;

pub use outcome::{render_outcome, LookupError};

/// A callable lookup exposed to agents
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON schema of the parameters
    fn describe(&self) -> ToolDescription;

    /// Run the lookup; parameters have already been validated against the schema
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool metadata advertised to the completion service
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of named tools
pub struct ToolSystem {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolSystem {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registry with every builtin lookup bound to `repository`
    pub fn with_builtin_tools(repository: Arc<dyn Repository>) -> Self {
        let mut system = Self::new();
        for tool in builtin::all_tools(repository) {
            system.register(tool);
        }
        system
    }

    /// Add a tool; a later registration under the same name replaces the earlier one
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.describe().name;
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Get tool description
    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions for the named tools, skipping names that are not registered
    pub fn describe_tools(&self, names: &[&str]) -> Vec<ToolDescription> {
        names
            .iter()
            .filter_map(|name| self.describe_tool(name))
            .collect()
    }

    /// Execute tool with validated parameters
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        self.validate_parameters(tool.as_ref(), parameters)?;

        tool.execute(parameters).await
    }

    fn validate_parameters(&self, tool: &dyn Tool, parameters: &Value) -> Result<(), ToolError> {
        let description = tool.describe();
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    /// Registered tool names, sorted
    pub fn list_tools(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

impl Default for ToolSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors for calls that never produced a lookup result
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryRepository;
    use serde_json::json;

    fn seeded_system() -> ToolSystem {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::seeded().unwrap());
        ToolSystem::with_builtin_tools(repo)
    }

    #[tokio::test]
    async fn test_tool_system_creation() {
        let tool_system = ToolSystem::new();
        assert_eq!(tool_system.list_tools().len(), 0);
    }

    #[tokio::test]
    async fn test_builtin_registration() {
        let tool_system = seeded_system();
        let tools = tool_system.list_tools();
        assert_eq!(tools.len(), 9);
        assert!(tools.contains(&"get_inventory".to_string()));
        assert!(tools.contains(&"find_orders_for_customer".to_string()));
    }

    #[tokio::test]
    async fn test_tool_execution_unknown_tool() {
        let tool_system = seeded_system();
        let params = json!({"test": "value"});

        let result = tool_system.execute_tool("unknown", &params).await;
        assert!(matches!(result, Err(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_parameters_validated_before_execution() {
        let tool_system = seeded_system();

        let result = tool_system
            .execute_tool("get_inventory", &json!({"product_id": "product_A"}))
            .await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));

        let result = tool_system
            .execute_tool(
                "get_inventory",
                &json!({"product_id": "product_A", "quantity": -1}),
            )
            .await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_describe_tools_skips_unknown_names() {
        let tool_system = seeded_system();
        let descriptions = tool_system.describe_tools(&["get_customer_zone", "nope"]);
        assert_eq!(descriptions.len(), 1);
        assert_eq!(descriptions[0].name, "get_customer_zone");
    }
}
