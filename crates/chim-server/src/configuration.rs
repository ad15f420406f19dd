use crate::error::{to_env_var, ConfigError};
use chim::filesystem::FileAccessConfig;
use chim::providers::configs::{ProviderConfig, ProviderKind};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Settings file used when `CHIM_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "chim.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enabled: default_enabled(),
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "type", default, deserialize_with = "deserialize_kind")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: String::new(),
            model: default_model(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ProviderSettings {
    // Convert to the chim ProviderConfig
    pub fn to_config(&self) -> ProviderConfig {
        ProviderConfig {
            kind: self.kind,
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Replaces the built-in persona when set
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tool_rounds: default_max_tool_rounds(),
            provider_timeout_secs: None,
        }
    }
}

impl AgentSettings {
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// The configured persona, ignoring a blank override
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub filesystem: FileAccessConfig,
}

impl Settings {
    /// Load defaults, then `path` if it exists, then `CHIM_*` environment variables
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.enabled", default_enabled())?
            // Provider defaults
            .set_default("provider.type", ProviderKind::default().to_string())?
            .set_default("provider.model", default_model())?
            // Agent defaults
            .set_default("agent.max_tool_rounds", default_max_tool_rounds() as u64)?
            // Optional settings file
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("CHIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("filesystem.allowed_dirs")
                    .with_list_parse_key("filesystem.blocked_extensions")
                    .with_list_parse_key("filesystem.blocked_directories"),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        let settings = match result {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                } else if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                return Err(ConfigError::Other(err));
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_tool_rounds must be at least 1".to_string(),
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "provider.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the settings file: `CHIM_CONFIG` or `chim.toml` in the working directory
pub fn config_path() -> PathBuf {
    std::env::var("CHIM_CONFIG")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<ProviderKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    ProviderKind::from_str(raw.trim())
        .map_err(|_| serde::de::Error::custom(format!("unknown provider type: {}", raw)))
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3100
}

fn default_enabled() -> bool {
    true
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

fn default_max_tool_rounds() -> usize {
    chim::agent::DEFAULT_MAX_TOOL_ROUNDS
}
