//! Seam between the protocol loop and the tools it serves.

use {async_trait::async_trait, serde_json::Value};

use crate::types::{McpToolDef, ToolsCallResult};

/// Tool provider behind an MCP server.
///
/// `call_tool` never fails at the protocol level: tool errors, including
/// unknown tool names, come back as results with `is_error` set.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Definitions returned from `tools/list`.
    fn tools(&self) -> Vec<McpToolDef>;

    /// Run one tool call.
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolsCallResult;
}
