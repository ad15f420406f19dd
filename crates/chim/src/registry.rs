use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;
use crate::systems::System;

/// The immutable set of tools the agent may invoke.
///
/// Built once from an ordered list of systems and shared by reference with
/// every turn. Tool names are unique across all systems.
pub struct ToolRegistry {
    systems: Vec<Box<dyn System>>,
    tools: Vec<Tool>,
    routes: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(systems: Vec<Box<dyn System>>) -> Result<Self> {
        let mut tools = Vec::new();
        let mut routes = HashMap::new();

        for (index, system) in systems.iter().enumerate() {
            for tool in system.tools() {
                if routes.insert(tool.name.clone(), index).is_some() {
                    bail!(
                        "Duplicate tool name '{}' registered by system '{}'",
                        tool.name,
                        system.name()
                    );
                }
                tools.push(tool.clone());
            }
        }

        Ok(Self {
            systems,
            tools,
            routes,
        })
    }

    /// All tools, in system registration order then declaration order
    pub fn list(&self) -> &[Tool] {
        &self.tools
    }

    pub fn systems(&self) -> impl Iterator<Item = &dyn System> {
        self.systems.iter().map(|system| system.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Route a call to the system owning `name`
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolResult<Value> {
        let index = self
            .routes
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        self.systems[*index].call(name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoSystem {
        name: String,
        tools: Vec<Tool>,
    }

    impl EchoSystem {
        fn new(name: &str, tool_names: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                tools: tool_names
                    .iter()
                    .map(|tool| {
                        Tool::new(
                            *tool,
                            "reply with the input",
                            json!({
                                "type": "object",
                                "properties": {"message": {"type": "string"}},
                                "required": ["message"]
                            }),
                        )
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl System for EchoSystem {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "Echoes input back"
        }

        fn instructions(&self) -> &str {
            "Use the echo tools to get your message back"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool: &str, arguments: Value) -> ToolResult<Value> {
            let message = arguments
                .get("message")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidParameters("message parameter required".into()))?;
            Ok(json!({ "tool": tool, "system": self.name, "message": message }))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![
            Box::new(EchoSystem::new("first", &["echo", "shout"])),
            Box::new(EchoSystem::new("second", &["whisper"])),
        ])
        .unwrap()
    }

    #[test]
    fn test_list_is_ordered_and_stable() {
        let registry = registry();
        let names: Vec<_> = registry.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "shout", "whisper"]);
        assert_eq!(registry.list(), registry.list());
        assert_eq!(registry.systems().count(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ToolRegistry::new(vec![
            Box::new(EchoSystem::new("first", &["echo"])),
            Box::new(EchoSystem::new("second", &["echo"])),
        ]);
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Duplicate tool name 'echo'"));
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_owner() {
        let registry = registry();
        let result = registry
            .dispatch("whisper", json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result["system"], "second");
        assert_eq!(result["tool"], "whisper");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = registry();
        let err = registry.dispatch("missing", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("missing".to_string()));
        assert_eq!(err.to_string(), "Unknown tool: missing");
    }

    #[tokio::test]
    async fn test_dispatch_propagates_handler_error() {
        let registry = registry();
        let err = registry.dispatch("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
