use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::base::{Provider, ProviderChatResponse};
use super::configs::ProviderConfig;
use super::utils::{create_request, normalize_endpoint};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Provider adapter for any vendor speaking the OpenAI chat-completions dialect
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
    url: Url,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: ProviderConfig) -> AgentResult<Self> {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(AgentError::MissingCredential(config.kind.label().to_string())),
        };
        let url = normalize_endpoint(config.kind, &config.endpoint)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            url,
            api_key,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn post(&self, payload: Value) -> AgentResult<Value> {
        let mut request = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&payload);
        for (name, value) in self.config.kind.extra_headers() {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AgentError::Provider {
                label: self.label().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        // Some gateways report failures in a 200 body
        if value.get("error").is_some() {
            return Err(AgentError::Provider {
                label: self.label().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(value)
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn label(&self) -> &str {
        self.config.kind.label()
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> AgentResult<ProviderChatResponse> {
        let payload = create_request(&self.config, messages, tools)?;

        tracing::debug!(
            provider = %self.config.kind,
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat completion request"
        );

        let response = self.post(payload).await?;
        serde_json::from_value(response).map_err(|e| AgentError::InvalidResponse(e.to_string()))
    }
}
