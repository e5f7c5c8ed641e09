use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use mentor_trader::chat::llm::{ChatModel, LlmError, OpenAiCompatibleClient, PromptMessage};
use mentor_trader::config::LlmConfig;

/// Serve `app` on an ephemeral port and return its completions URL.
async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1/chat/completions", addr)
}

fn client_for(url: String) -> OpenAiCompatibleClient {
    let config = LlmConfig {
        api_url: url,
        model: "stub-model".to_string(),
        timeout_secs: 5,
        ..LlmConfig::default()
    };
    OpenAiCompatibleClient::new(&config, "sk-test").unwrap()
}

fn prompt() -> Vec<PromptMessage> {
    vec![
        PromptMessage::new("system", "be a mentor"),
        PromptMessage::new("user", "what is a pip?"),
    ]
}

#[tokio::test]
async fn completes_against_openai_compatible_endpoint() {
    async fn handler(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(body["model"], "stub-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "what is a pip?");

        Json(json!({
            "model": "stub-model-2024",
            "choices": [{ "message": { "role": "assistant", "content": "A pip is 0.0001." } }]
        }))
    }

    let url = spawn_stub(Router::new().route("/v1/chat/completions", post(handler))).await;
    let completion = client_for(url).complete(&prompt()).await.unwrap();

    assert_eq!(completion.content, "A pip is 0.0001.");
    assert_eq!(completion.model, "stub-model-2024");
    assert!(!completion.mock);
}

#[tokio::test]
async fn provider_error_message_is_surfaced() {
    async fn handler() -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "message": "Rate limit reached" } })),
        )
    }

    let url = spawn_stub(Router::new().route("/v1/chat/completions", post(handler))).await;
    let err = client_for(url).complete(&prompt()).await.unwrap_err();

    match err {
        LlmError::Status { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Rate limit reached");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    async fn handler() -> impl IntoResponse {
        Json(json!({ "choices": [] }))
    }

    let url = spawn_stub(Router::new().route("/v1/chat/completions", post(handler))).await;
    let err = client_for(url).complete(&prompt()).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(format!("http://{}/v1/chat/completions", addr))
        .complete(&prompt())
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Transport(_)));
}
