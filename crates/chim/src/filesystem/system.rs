use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::SecureFileAccess;
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;
use crate::systems::System;

/// Read-only file tools over a [`SecureFileAccess`]
pub struct FileSystemSystem {
    access: Arc<SecureFileAccess>,
    tools: Vec<Tool>,
    instructions: String,
}

#[derive(Debug, Deserialize)]
struct ReadFileParams {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ListFilesParams {
    directory: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    recursive: bool,
}

#[derive(Debug, Deserialize)]
struct SearchFilesParams {
    directory: String,
    pattern: String,
    #[serde(default)]
    keyword: Option<String>,
}

impl FileSystemSystem {
    pub fn new(access: Arc<SecureFileAccess>) -> Self {
        let config = access.config();

        let read_file = Tool::new(
            "read_file",
            format!(
                "Read contents of a file from HerikaServer or service directories. \
                Cannot read binary files or files larger than {}.",
                human_size(config.max_file_size)
            ),
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path (absolute or relative to allowed base directories)"
                    }
                },
                "required": ["path"]
            }),
        );

        let list_files = Tool::new(
            "list_files",
            format!(
                "List files and directories in a given path. \
                Can list recursively up to {} levels deep.",
                config.max_recursive_depth
            ),
            json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory path to list"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": format!(
                            "Whether to list recursively (max depth {})",
                            config.max_recursive_depth
                        )
                    }
                },
                "required": ["directory"]
            }),
        );

        let search_files = Tool::new(
            "search_files",
            "Search for files by name pattern (glob) and optionally search content by keyword.",
            json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory to search in"
                    },
                    "pattern": {
                        "type": "string",
                        "description": "Filename pattern (glob, e.g., \"*.php\", \"config*\")"
                    },
                    "keyword": {
                        "type": "string",
                        "description": "Optional keyword to search within file contents"
                    }
                },
                "required": ["directory", "pattern"]
            }),
        );

        let dirs = access
            .allowed_dirs()
            .iter()
            .map(|dir| format!("- {}", dir.display()))
            .collect::<Vec<_>>()
            .join("\n");
        let instructions = format!(
            "You can only read files inside these directories:\n{}\n\
            Relative paths resolve against the first one. Listings return at most {} entries \
            and searches at most {} matches; narrow the directory or pattern if results are truncated.",
            dirs, config.max_list_entries, config.max_search_matches
        );

        Self {
            access,
            tools: vec![read_file, list_files, search_files],
            instructions,
        }
    }

    async fn read_file(&self, arguments: Value) -> ToolResult<Value> {
        let params: ReadFileParams = parse_params(arguments)?;
        let content = self
            .blocking(move |access| access.read_file(&params.path))
            .await?;
        to_value(&content)
    }

    async fn list_files(&self, arguments: Value) -> ToolResult<Value> {
        let params: ListFilesParams = parse_params(arguments)?;
        let listing = self
            .blocking(move |access| access.list_files(&params.directory, params.recursive))
            .await?;
        to_value(&listing)
    }

    async fn search_files(&self, arguments: Value) -> ToolResult<Value> {
        let params: SearchFilesParams = parse_params(arguments)?;
        let results = self
            .blocking(move |access| {
                access.search_files(&params.directory, &params.pattern, params.keyword.as_deref())
            })
            .await?;
        to_value(&results)
    }

    /// Run synchronous file work off the async runtime
    async fn blocking<T, F>(&self, work: F) -> ToolResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SecureFileAccess) -> ToolResult<T> + Send + 'static,
    {
        let access = Arc::clone(&self.access);
        tokio::task::spawn_blocking(move || work(&access))
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("File task failed: {}", e)))?
    }
}

#[async_trait]
impl System for FileSystemSystem {
    fn name(&self) -> &str {
        "FileSystem"
    }

    fn description(&self) -> &str {
        "Read-only access to HerikaServer and service files: read, list, and search"
    }

    fn instructions(&self) -> &str {
        &self.instructions
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool: &str, arguments: Value) -> ToolResult<Value> {
        match tool {
            "read_file" => self.read_file(arguments).await,
            "list_files" => self.list_files(arguments).await,
            "search_files" => self.search_files(arguments).await,
            _ => Err(ToolError::UnknownTool(tool.to_string())),
        }
    }
}

fn parse_params<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> ToolResult<Value> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

/// Accepts booleans, `"true"`/`"false"` strings and null
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "recursive must be a boolean, got \"{}\"",
                other
            ))),
        },
        Some(other) => Err(serde::de::Error::custom(format!(
            "recursive must be a boolean, got {}",
            other
        ))),
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}
