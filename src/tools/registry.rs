//! Tool registry for managing MCP tool handlers.
//!
//! Provides a `ToolHandler` trait for implementing tools and a `ToolRegistry`
//! for registering and invoking them.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool as McpTool};

use crate::tools::ToolError;

/// Boxed future returned by [`ToolHandler::execute`]; resolves to the tool's
/// text output.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// Trait for handling MCP tool invocations.
///
/// Each tool implements this trait to define its schema and execution logic.
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's name (e.g., "get_ticket").
    fn name(&self) -> &str;

    /// Returns the tool's description.
    fn description(&self) -> &str;

    /// Returns the input schema for this tool.
    fn input_schema(&self) -> JsonObject;

    /// Executes the tool with the given arguments.
    fn execute(&self, args: JsonObject) -> ToolFuture<'_>;

    /// Converts this handler to an `McpTool` for use in `list_tools`.
    fn to_mcp_tool(&self) -> McpTool {
        McpTool::new(
            self.name().to_string(),
            self.description().to_string(),
            Arc::new(self.input_schema()),
        )
    }
}

/// Registry for managing tool handlers.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler from a type that implements `ToolHandler`.
    pub fn register_handler<T: ToolHandler + 'static>(mut self, handler: T) -> Self {
        self.handlers
            .insert(handler.name().to_string(), Arc::new(handler));
        self
    }

    /// Get a tool handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// List all registered tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Get all registered tools as `McpTool` instances for `list_tools`.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.handlers
            .values()
            .map(|handler| handler.to_mcp_tool())
            .collect()
    }

    /// Execute a tool by name with the given arguments.
    pub async fn call_tool(&self, name: &str, args: JsonObject) -> Result<String, ToolError> {
        let handler = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        handler.execute(args).await
    }

    /// Return the number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Return `true` if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
