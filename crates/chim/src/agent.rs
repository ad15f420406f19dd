use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{AgentError, AgentResult, ToolError, ToolResult};
use crate::models::message::{Message, ToolCall};
use crate::providers::base::{Provider, ProviderChatResponse, Usage};
use crate::registry::ToolRegistry;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Outcome of one successful turn
#[derive(Debug, Clone)]
pub struct Turn {
    /// Text of the final assistant message, empty if it carried none
    pub answer: String,
    /// Provider calls made, including the final one
    pub rounds: usize,
    pub usage: Usage,
    /// The whole conversation, starting with the system message
    pub messages: Vec<Message>,
}

/// Agent integrates a foundational LLM with the tools it may call
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: Arc<ToolRegistry>,
    system_prompt: String,
    max_tool_rounds: usize,
    provider_timeout: Option<Duration>,
}

impl Agent {
    pub fn new(
        provider: Box<dyn Provider>,
        registry: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            system_prompt: system_prompt.into(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            provider_timeout: None,
        }
    }

    /// Limit on provider calls per turn; at least one call is always allowed
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    /// Abort any single provider call that takes longer than `timeout`
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// Answer `user_message`, returning only the final text
    pub async fn reply(&self, user_message: &str, history: &[Message]) -> AgentResult<String> {
        self.run_turn(user_message, history)
            .await
            .map(|turn| turn.answer)
    }

    /// Run the bounded tool-calling loop for one user message.
    ///
    /// Tool failures are reported back to the model as `{"error": ...}`
    /// results and never end the turn. Provider failures, an empty choice
    /// list and running out of rounds do.
    pub async fn run_turn(&self, user_message: &str, history: &[Message]) -> AgentResult<Turn> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend_from_slice(history);
        messages.push(Message::user(user_message));

        let mut usage = Usage::default();
        let mut rounds = 0;

        while rounds < self.max_tool_rounds {
            rounds += 1;
            tracing::debug!(round = rounds, provider = self.provider.label(), "calling provider");

            let response = self.complete(&messages).await?;
            if let Some(round_usage) = &response.usage {
                usage.add(round_usage);
            }

            let Some(choice) = response.choices.into_iter().next() else {
                return Err(AgentError::NoResponse(self.provider.label().to_string()));
            };
            let assistant = choice.message;

            if !assistant.has_tool_calls() {
                let answer = assistant.content.clone().unwrap_or_default();
                messages.push(assistant);
                tracing::info!(rounds, "turn complete");
                return Ok(Turn {
                    answer,
                    rounds,
                    usage,
                    messages,
                });
            }

            let calls = assistant.tool_calls().to_vec();
            messages.push(Message::assistant_with_tool_calls(
                assistant.content,
                calls.clone(),
            ));

            for call in &calls {
                let content = match self.execute(call).await {
                    Ok(result) => serde_json::to_string(&result)
                        .unwrap_or_else(|e| error_payload(&e.to_string())),
                    Err(e) => error_payload(&e.to_string()),
                };
                messages.push(Message::tool_result(&call.id, call.name(), content));
            }
        }

        tracing::warn!(limit = self.max_tool_rounds, "tool round limit reached");
        Err(AgentError::MaxRoundsExceeded(self.max_tool_rounds))
    }

    async fn complete(&self, messages: &[Message]) -> AgentResult<ProviderChatResponse> {
        let call = self.provider.complete(messages, self.registry.list());
        match self.provider_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => call.await,
        }
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult<Value> {
        tracing::info!(tool = call.name(), id = %call.id, "executing tool");
        let result = match parse_arguments(&call.function.arguments) {
            Ok(arguments) => self.registry.dispatch(call.name(), arguments).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => tracing::info!(tool = call.name(), "tool succeeded"),
            Err(e) => tracing::warn!(tool = call.name(), error = %e, "tool failed"),
        }
        result
    }
}

/// Decode a model-produced argument string. Blank means no arguments.
fn parse_arguments(raw: &str) -> ToolResult<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ToolError::InvalidParameters(
            "arguments must be a JSON object".to_string(),
        )),
        Err(e) => Err(ToolError::InvalidParameters(format!(
            "could not parse arguments: {}",
            e
        ))),
    }
}

fn error_payload(message: &str) -> String {
    json!({ "error": message }).to_string()
}
