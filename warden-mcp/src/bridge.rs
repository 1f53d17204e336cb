//! Bridge MCP tools to the [`ToolDyn`] trait.
//!
//! [`McpToolBridge`] wraps an MCP tool definition and a shared [`McpClient`],
//! forwarding `call_dyn` to the MCP server. This allows MCP tools to be
//! registered in a [`ToolRegistry`] and used alongside native tools.

use std::sync::Arc;

#[allow(unused_imports)] // ToolRegistry used in doc links
use warden_tool::ToolRegistry;
use warden_types::{
    McpError, ToolContext, ToolDefinition, ToolDyn, ToolError, ToolOutput, WasmBoxedFuture,
};

use crate::client::{McpClient, call_tool_result_to_output};

/// Bridges an MCP tool to the [`ToolDyn`] trait.
///
/// Each bridge holds a shared reference to the [`McpClient`] and the tool's
/// definition. When `call_dyn` is invoked, it forwards the call to the MCP
/// server via `McpClient::call_tool`.
///
/// # Example
///
/// ```ignore
/// let client = Arc::new(McpClient::connect_stdio(config).await?);
/// let bridges = McpToolBridge::discover(&client).await?;
/// let mut registry = ToolRegistry::new();
/// for bridge in bridges {
///     registry.register_dyn(bridge);
/// }
/// ```
pub struct McpToolBridge {
    /// Shared MCP client for making tool calls.
    client: Arc<McpClient>,
    /// The tool definition (name, description, schema).
    definition: ToolDefinition,
}

impl McpToolBridge {
    /// Create a new bridge for a specific tool.
    #[must_use]
    pub fn new(client: Arc<McpClient>, definition: ToolDefinition) -> Self {
        Self { client, definition }
    }

    /// Discover all tools from an MCP server and create bridges for them.
    ///
    /// Fetches the tool list from the server and returns a bridge for each tool,
    /// ready to be registered in a [`ToolRegistry`] via `register_dyn`.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] if the tool listing fails.
    pub async fn discover(client: &Arc<McpClient>) -> Result<Vec<Arc<dyn ToolDyn>>, McpError> {
        let tools = client.list_all_tools().await?;
        let bridges: Vec<Arc<dyn ToolDyn>> = tools
            .into_iter()
            .map(|def| {
                let bridge = McpToolBridge::new(Arc::clone(client), def);
                Arc::new(bridge) as Arc<dyn ToolDyn>
            })
            .collect();
        Ok(bridges)
    }
}

impl ToolDyn for McpToolBridge {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn call_dyn<'a>(
        &'a self,
        input: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> WasmBoxedFuture<'a, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let arguments = match input {
                serde_json::Value::Object(m) => Some(m),
                serde_json::Value::Null => None,
                other => {
                    return Err(ToolError::InvalidInput(format!(
                        "expected object or null, got {other}",
                    )));
                }
            };

            let result = self
                .client
                .call_tool(&self.definition.name, arguments)
                .await
                .map_err(|e| ToolError::ExecutionFailed(Box::new(e)))?;

            Ok(call_tool_result_to_output(result))
        })
    }
}

/// Extension methods on [`McpClient`] for tool discovery.
impl McpClient {
    /// Discover all tools and return them as [`ToolDyn`] trait objects.
    ///
    /// Convenience method that creates [`McpToolBridge`] instances for each
    /// tool on the server. The returned `Arc<dyn ToolDyn>` values can be
    /// registered in a [`ToolRegistry`] via `register_dyn`.
    ///
    /// # Arguments
    ///
    /// * `self_arc` - An `Arc<McpClient>` to share across bridges.
    ///
    /// # Errors
    ///
    /// Returns [`McpError`] if the tool listing fails.
    pub async fn discover_tools(
        self_arc: &Arc<McpClient>,
    ) -> Result<Vec<Arc<dyn ToolDyn>>, McpError> {
        McpToolBridge::discover(self_arc).await
    }
}
