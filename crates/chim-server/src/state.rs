use chim::registry::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

use crate::configuration::Settings;
use crate::error::ConfigError;

/// Shared application state
///
/// The tool registry is fixed for the life of the process. Provider and agent
/// settings are not cached here: every request reloads them from `config_path`
/// and the environment.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub config_path: PathBuf,
}

impl AppState {
    pub fn new(registry: Arc<ToolRegistry>, config_path: PathBuf) -> Self {
        Self {
            registry,
            config_path,
        }
    }

    /// Read the current settings fresh from their sources
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        Settings::load(&self.config_path)
    }
}
