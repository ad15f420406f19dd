use std::time::Duration;

use thiserror::Error;

/// Failures raised while executing a single tool call.
///
/// These never end a turn: the agent folds them into a `tool` message so the
/// model can read the message and decide what to do next.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Access denied: path {0} is outside allowed directories")]
    AccessDenied(String),

    #[error("Path not accessible: {0}")]
    NotAccessible(String),

    #[error("Cannot read file with blocked extension: {0}")]
    BlockedExtension(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Failures that end a turn.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{0} API key not configured")]
    MissingCredential(String),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("{label} API error ({status}): {body}")]
    Provider {
        label: String,
        status: u16,
        body: String,
    },

    #[error("Request to provider failed: {0}")]
    Transport(String),

    #[error("Could not parse provider response: {0}")]
    InvalidResponse(String),

    #[error("No response from {0}")]
    NoResponse(String),

    #[error("Maximum tool rounds ({0}) exceeded")]
    MaxRoundsExceeded(usize),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),
}

pub type AgentResult<T> = Result<T, AgentError>;
