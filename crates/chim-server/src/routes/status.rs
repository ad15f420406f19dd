use crate::configuration::Settings;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

/// What the status endpoints reveal about the active settings. The
/// credential itself is never reported.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigSummary {
    provider: String,
    model: String,
    has_api_key: bool,
    max_tool_rounds: usize,
}

impl From<&Settings> for ConfigSummary {
    fn from(settings: &Settings) -> Self {
        Self {
            provider: settings.provider.kind.to_string(),
            model: settings.provider.model.clone(),
            has_api_key: settings.provider.to_config().has_api_key(),
            max_tool_rounds: settings.agent.max_tool_rounds,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    config: ConfigSummary,
    timestamp: i64,
}

async fn status_handler(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    let (code, status, config) = match state.load_settings() {
        Ok(settings) => (StatusCode::OK, "ok", ConfigSummary::from(&settings)),
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                ConfigSummary::default(),
            )
        }
    };

    (
        code,
        Json(StatusResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            config,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }),
    )
}

async fn reload_config_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.load_settings() {
        Ok(settings) => {
            let config = ConfigSummary::from(&settings);
            tracing::info!(
                provider = %config.provider,
                model = %config.model,
                has_api_key = config.has_api_key,
                "configuration reloaded"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Configuration reloaded successfully",
                    "config": config,
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": e.to_string(),
            })),
        ),
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/reload-config", post(reload_config_handler))
        .with_state(state)
}
