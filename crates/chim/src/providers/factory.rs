use super::{base::Provider, configs::ProviderConfig, openai_compatible::OpenAiCompatibleProvider};
use crate::errors::AgentResult;

/// Build the provider for one turn. Every supported kind shares the
/// OpenAI-compatible adapter; the kind carried in the config selects its
/// endpoint, label and headers.
pub fn get_provider(config: ProviderConfig) -> AgentResult<Box<dyn Provider + Send + Sync>> {
    Ok(Box::new(OpenAiCompatibleProvider::new(config)?))
}
