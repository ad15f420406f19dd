use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// The environment variable that sets the settings field at `field_path`
/// (`provider.api_key` becomes `CHIM_PROVIDER__API_KEY`)
pub fn to_env_var(field_path: &str) -> String {
    format!("CHIM_{}", field_path.replace('.', "__").to_uppercase())
}
