use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub const OPENROUTER_REFERER: &str = "https://github.com/Dwemer-Dynamics/chim-mcp-server";
pub const OPENROUTER_TITLE: &str = "CHIM MCP Server";

/// The closed set of supported vendors. All of them speak the
/// OpenAI-compatible function-calling dialect; the kind only selects the
/// default endpoint, the error label and any identification headers.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    OpenAi,
    Google,
    NanoGpt,
    #[default]
    OpenRouter,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI-compatible (OpenAI)",
            ProviderKind::Google => "OpenAI-compatible (Google)",
            ProviderKind::NanoGpt => "OpenAI-compatible (NanoGPT)",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Google => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            ProviderKind::NanoGpt => "https://nano-gpt.com/api/v1/chat/completions",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
        }
    }

    /// Headers sent in addition to the bearer credential
    pub fn extra_headers(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ProviderKind::OpenRouter => &[
                ("HTTP-Referer", OPENROUTER_REFERER),
                ("X-Title", OPENROUTER_TITLE),
            ],
            _ => &[],
        }
    }
}

/// Everything needed to talk to one provider for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Chat-completions URL; empty means the vendor default
    #[serde(default)]
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderConfig {
    pub fn new<M: Into<String>>(kind: ProviderKind, model: M) -> Self {
        Self {
            kind,
            endpoint: String::new(),
            model: model.into(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}
