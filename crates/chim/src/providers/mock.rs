use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Choice, Provider, ProviderChatResponse, Usage};

/// One `complete` call as the provider received it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
}

/// A mock provider that returns pre-configured responses for testing and
/// records every call it was sent
pub struct MockProvider {
    responses: Arc<Mutex<Vec<AgentResult<ProviderChatResponse>>>>,
    fallback: Option<Message>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of assistant messages
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_responses(responses.into_iter().map(|m| Ok(respond(m))).collect())
    }

    /// Create a mock provider with explicit responses, including failures
    pub fn with_responses(responses: Vec<AgentResult<ProviderChatResponse>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            fallback: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Keep answering with this message once the scripted responses run out
    pub fn repeating(message: Message) -> Self {
        Self {
            fallback: Some(message),
            ..Self::with_responses(Vec::new())
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle on the recorded calls, usable after the provider is boxed
    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.calls)
    }
}

/// Wrap an assistant message as a single-choice response
pub fn respond(message: Message) -> ProviderChatResponse {
    ProviderChatResponse {
        id: None,
        choices: vec![Choice {
            finish_reason: Some(if message.has_tool_calls() { "tool_calls" } else { "stop" }.to_string()),
            message,
        }],
        usage: Some(Usage::new(Some(10), Some(5), Some(15))),
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn label(&self) -> &str {
        "Mock"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> AgentResult<ProviderChatResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return responses.remove(0);
        }
        match &self.fallback {
            Some(message) => Ok(respond(message.clone())),
            None => Err(AgentError::Transport("mock provider exhausted".to_string())),
        }
    }
}
