use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ToolResult;
use crate::models::tool::Tool;

/// Core trait that defines a system of related tools that can be operated by an AI agent
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions, rendered into the default persona
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call one of this system's tools with already-decoded arguments.
    ///
    /// Each tool validates its own arguments and reports problems as
    /// `ToolError::InvalidParameters`.
    async fn call(&self, tool: &str, arguments: Value) -> ToolResult<Value>;
}
