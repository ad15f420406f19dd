use serde_json::{json, Value};
use std::collections::HashSet;
use url::Url;

use super::configs::{ProviderConfig, ProviderKind};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> AgentResult<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(AgentError::InvalidConfig(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Build the chat-completions request body
pub fn create_request(
    config: &ProviderConfig,
    messages: &[Message],
    tools: &[Tool],
) -> AgentResult<Value> {
    let tools_spec = tools_to_openai_spec(tools)?;

    let mut payload = json!({
        "model": config.model,
        "messages": messages,
    });

    if !tools_spec.is_empty() {
        payload["tools"] = json!(tools_spec);
        payload["tool_choice"] = json!("auto");
    }
    if let Some(temp) = config.temperature {
        payload["temperature"] = json!(temp);
    }
    if let Some(tokens) = config.max_tokens {
        payload["max_tokens"] = json!(tokens);
    }

    Ok(payload)
}

/// Resolve the URL a provider kind should be called at
///
/// An empty endpoint falls back to the vendor default. A base URL such as
/// `https://api.openai.com/v1` gets `/chat/completions` appended.
pub fn normalize_endpoint(kind: ProviderKind, endpoint: &str) -> AgentResult<Url> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let full = if trimmed.is_empty() {
        kind.default_endpoint().to_string()
    } else if trimmed.ends_with(CHAT_COMPLETIONS_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, CHAT_COMPLETIONS_PATH)
    };

    let url = Url::parse(&full)
        .map_err(|e| AgentError::InvalidConfig(format!("endpoint '{}': {}", full, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AgentError::InvalidConfig(format!(
            "endpoint '{}' uses unsupported scheme '{}'",
            full, scheme
        ))),
    }
}
