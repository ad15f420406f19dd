mod configuration;
mod error;
mod routes;
mod state;

use chim::filesystem::{FileSystemSystem, SecureFileAccess};
use chim::registry::ToolRegistry;
use configuration::Settings;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = configuration::config_path();
    let settings = Settings::load(&config_path)?;

    if !settings.server.enabled {
        info!("chimd is disabled (server.enabled = false), exiting");
        return Ok(());
    }

    let provider = settings.provider.to_config();
    let api_key = if provider.has_api_key() {
        "configured"
    } else {
        "NOT configured"
    };
    let endpoint = if provider.endpoint.is_empty() {
        provider.kind.default_endpoint()
    } else {
        provider.endpoint.as_str()
    };
    info!(
        config = %config_path.display(),
        provider = %provider.kind,
        model = %provider.model,
        endpoint,
        api_key,
        max_tool_rounds = settings.agent.max_tool_rounds,
        "configuration loaded"
    );

    // Filesystem limits and the tool set are fixed for the life of the process
    let access = Arc::new(SecureFileAccess::new(settings.filesystem.clone())?);
    for dir in access.allowed_dirs() {
        info!("allowing file access under {}", dir.display());
    }
    let registry = ToolRegistry::new(vec![Box::new(FileSystemSystem::new(access))])?;
    info!("registered {} tools", registry.list().len());

    let state = state::AppState::new(Arc::new(registry), config_path);
    let app = routes::configure(state);

    let listener = tokio::net::TcpListener::bind(settings.server.address()).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down gracefully");
}
