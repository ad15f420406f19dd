use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chim::agent::Agent;
use chim::models::message::Message;
use chim::prompt_template::default_system_prompt;
use chim::providers::factory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    history: Vec<HistoryMessage>,
}

/// Prior turns supplied by the caller. Only plain user and assistant text
/// is accepted, so no tool result can arrive without its request.
#[derive(Debug, Deserialize)]
struct HistoryMessage {
    role: HistoryRole,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum HistoryRole {
    User,
    Assistant,
}

impl From<HistoryMessage> for Message {
    fn from(message: HistoryMessage) -> Self {
        match message.role {
            HistoryRole::User => Message::user(message.content),
            HistoryRole::Assistant => Message::assistant(message.content),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ChatResponse {
    fn failure(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                response: String::new(),
                error: Some(error.into()),
            }),
        )
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    if request.message.trim().is_empty() {
        return ChatResponse::failure(StatusCode::BAD_REQUEST, "Message is required");
    }

    let history: Vec<Message> = request.history.into_iter().map(Message::from).collect();
    match run_turn(&state, &request.message, &history).await {
        Ok(response) => (
            StatusCode::OK,
            Json(ChatResponse {
                response,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Chat error: {}", e);
            ChatResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Build a fresh agent from the current settings and run one turn
async fn run_turn(state: &AppState, message: &str, history: &[Message]) -> anyhow::Result<String> {
    let settings = state.load_settings()?;

    let provider = factory::get_provider(settings.provider.to_config())?;
    let system_prompt = match settings.agent.system_prompt() {
        Some(prompt) => prompt.to_string(),
        None => default_system_prompt(&state.registry)?,
    };

    let mut agent = Agent::new(provider, state.registry.clone(), system_prompt)
        .with_max_tool_rounds(settings.agent.max_tool_rounds);
    if let Some(timeout) = settings.agent.provider_timeout() {
        agent = agent.with_provider_timeout(timeout);
    }

    tracing::info!(
        provider = %settings.provider.kind,
        model = %settings.provider.model,
        history = history.len(),
        "handling chat request"
    );
    let answer = agent.reply(message, history).await?;
    Ok(answer)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{clean_env, send, state};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use serial_test::serial;
    use std::fs;
    use std::path::Path;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn write_settings(path: &Path, endpoint: &str, api_key: Option<&str>) {
        let key_line = api_key
            .map(|key| format!("api_key = \"{}\"\n", key))
            .unwrap_or_default();
        fs::write(
            path,
            format!(
                "[provider]\ntype = \"openai\"\nmodel = \"test-model\"\nendpoint = \"{}\"\n{}\n[agent]\nmax_tool_rounds = 3\n",
                endpoint, key_line
            ),
        )
        .unwrap();
    }

    fn completion(message: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"message": message, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }))
    }

    #[tokio::test]
    #[serial]
    async fn test_chat_runs_tool_round() {
        clean_env();
        let files = tempfile::tempdir().unwrap();
        fs::write(files.path().join("notes.txt"), "The door code is 1234").unwrap();
        let config_dir = tempfile::tempdir().unwrap();
        let config_path = config_dir.path().join("chim.toml");

        let server = MockServer::start().await;
        // the follow-up call carries the tool result
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"messages": [{"role": "system"}, {"role": "user"}, {"role": "assistant"}, {"role": "tool", "tool_call_id": "call_1"}]})))
            .respond_with(completion(json!({"role": "assistant", "content": "The code is 1234."})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(completion(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "read_file", "arguments": "{\"path\": \"notes.txt\"}"}
                }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        write_settings(&config_path, &format!("{}/v1", server.uri()), Some("test-key"));
        let (status, body) = send(
            state(files.path(), &config_path),
            chat_request(json!({"message": "What is the door code?"})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body, json!({"response": "The code is 1234."}));
    }

    #[tokio::test]
    #[serial]
    async fn test_chat_passes_history() {
        clean_env();
        let files = tempfile::tempdir().unwrap();
        let config_dir = tempfile::tempdir().unwrap();
        let config_path = config_dir.path().join("chim.toml");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": "Who is Lydia?"},
                    {"role": "assistant", "content": "Your housecarl."},
                    {"role": "user", "content": "Where is she?"}
                ]
            })))
            .respond_with(completion(json!({"role": "assistant", "content": "In Whiterun."})))
            .expect(1)
            .mount(&server)
            .await;

        write_settings(&config_path, &server.uri(), Some("test-key"));
        let (status, body) = send(
            state(files.path(), &config_path),
            chat_request(json!({
                "message": "Where is she?",
                "history": [
                    {"role": "user", "content": "Who is Lydia?"},
                    {"role": "assistant", "content": "Your housecarl."}
                ]
            })),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["response"], "In Whiterun.");
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_message_rejected() {
        clean_env();
        let files = tempfile::tempdir().unwrap();
        let config_path = files.path().join("absent.toml");

        for body in [json!({"message": ""}), json!({"message": "   "}), json!({})] {
            let (status, response) =
                send(state(files.path(), &config_path), chat_request(body)).await;
            assert_eq!(status, 400);
            assert_eq!(
                response,
                json!({"response": "", "error": "Message is required"})
            );
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_api_key_fails_turn() {
        clean_env();
        let files = tempfile::tempdir().unwrap();
        let config_path = files.path().join("chim.toml");
        write_settings(&config_path, "http://127.0.0.1:9", None);

        let (status, body) = send(
            state(files.path(), &config_path),
            chat_request(json!({"message": "hello"})),
        )
        .await;
        assert_eq!(status, 500);
        assert_eq!(body["response"], "");
        assert_eq!(
            body["error"],
            "OpenAI-compatible (OpenAI) API key not configured"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_provider_error_surfaces() {
        clean_env();
        let files = tempfile::tempdir().unwrap();
        let config_path = files.path().join("chim.toml");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;
        write_settings(&config_path, &server.uri(), Some("wrong"));

        let (status, body) = send(
            state(files.path(), &config_path),
            chat_request(json!({"message": "hello"})),
        )
        .await;
        assert_eq!(status, 500);
        assert_eq!(
            body["error"],
            "OpenAI-compatible (OpenAI) API error (401): bad key"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_settings_reloaded_per_request() {
        clean_env();
        let files = tempfile::tempdir().unwrap();
        let config_path = files.path().join("chim.toml");
        let app_state = state(files.path(), &config_path);

        write_settings(&config_path, "http://127.0.0.1:9", None);
        let (status, _) = send(app_state.clone(), chat_request(json!({"message": "hi"}))).await;
        assert_eq!(status, 500);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(json!({"role": "assistant", "content": "hello"})))
            .mount(&server)
            .await;
        write_settings(&config_path, &server.uri(), Some("now-set"));

        let (status, body) = send(app_state, chat_request(json!({"message": "hi"}))).await;
        assert_eq!(status, 200);
        assert_eq!(body["response"], "hello");
    }
}
