use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use llamabox::chat::ChatContext;
use llamabox::ollama::{GenerateRequest, OllamaClient, OllamaError};

async fn tags() -> Json<Value> {
    Json(json!({
        "models": [
            {
                "name": "llama3-small-q3-k-s:latest",
                "size": 3_825_819_519u64,
                "modified_at": "2024-05-01T10:00:00.000000Z",
                "digest": "sha256:abc"
            },
            { "name": "phi3:latest", "size": 2_000_000_000u64 }
        ]
    }))
}

async fn generate(Json(body): Json<Value>) -> Response {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    match body["model"].as_str().unwrap_or_default() {
        "missing" => return (StatusCode::NOT_FOUND, "model 'missing' not found").into_response(),
        "refuses" if body["stream"] == json!(false) => {
            return Json(json!({ "error": "model requires more system memory" })).into_response();
        }
        "refuses" => {
            let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
                Ok("{\"response\":\"Par\",\"done\":false}\n"),
                Ok("{\"error\":\"model runner has unexpectedly stopped\"}\n"),
                Ok("{\"response\":\"never sent\",\"done\":true}\n"),
            ];
            return Body::from_stream(futures::stream::iter(chunks)).into_response();
        }
        "garbled" => return "this is not json".into_response(),
        "stalls" => {
            let first = futures::stream::iter(vec![Ok::<_, std::io::Error>(
                "{\"response\":\"Hel\",\"done\":false}\n",
            )]);
            return Body::from_stream(first.chain(futures::stream::pending())).into_response();
        }
        _ => {}
    }

    if body["stream"] == json!(true) {
        // Lines deliberately split across chunks
        let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
            Ok("{\"model\":\"m\",\"response\":\"Hel\",\"done\":false}\n{\"model\":\"m\",\"resp"),
            Ok("onse\":\"lo\",\"done\":false}\n"),
            Ok("{\"model\":\"m\",\"response\":\"\",\"done\":true,\"context\":[1,2,3]}\n"),
        ];
        return Body::from_stream(futures::stream::iter(chunks)).into_response();
    }

    let system = body["system"].as_str().unwrap_or("none");
    Json(json!({
        "model": body["model"],
        "response": format!("echo: {} [{}]", prompt, system),
        "done": true,
        "context": [7, 8]
    }))
    .into_response()
}

async fn spawn_fake_ollama() -> String {
    let app = Router::new()
        .route("/api/tags", get(tags))
        .route("/api/generate", post(generate));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_check_connection_and_list_models() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();

    assert!(client.check_connection().await);

    let models = client.list_models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "llama3-small-q3-k-s:latest");
    assert_eq!(models[0].size, 3_825_819_519);
    // Missing fields fall back to defaults
    assert_eq!(models[1].modified_at, "");
    assert_eq!(models[1].digest, "");
}

#[tokio::test]
async fn test_generate_returns_full_answer() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();
    let request = GenerateRequest::new("llama3", "hi").with_system(Some("be brief".to_string()));

    let response = client.generate(&request).await.unwrap();

    assert!(response.done);
    assert_eq!(response.response, "echo: hi [be brief]");
    assert_eq!(response.context, Some(vec![7, 8]));
}

#[tokio::test]
async fn test_generate_stream_reassembles_split_lines() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();
    let request = GenerateRequest::new("llama3", "hi");

    let mut chunks = client.generate_stream(&request).await.unwrap();
    let mut text = String::new();
    let mut context = None;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.unwrap();
        text.push_str(&chunk.response);
        if chunk.done {
            context = chunk.context;
        }
    }

    assert_eq!(text, "Hello");
    assert_eq!(context, Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_api_error_keeps_status_and_body() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();
    let request = GenerateRequest::new("missing", "hi");

    match client.generate(&request).await {
        Err(OllamaError::Api { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"));
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.response)),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = OllamaClient::new(format!("http://127.0.0.1:{}", port)).unwrap();
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, OllamaError::ServerNotRunning(_)));
}

#[tokio::test]
async fn test_error_body_on_success_status_is_a_model_error() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();
    let request = GenerateRequest::new("refuses", "hi");

    match client.generate(&request).await {
        Err(OllamaError::Model(message)) => assert!(message.contains("system memory")),
        other => panic!("unexpected result: {:?}", other.map(|r| r.response)),
    }
}

#[tokio::test]
async fn test_error_line_mid_stream_ends_the_stream() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();
    let request = GenerateRequest::new("refuses", "hi");

    let items: Vec<_> = client.generate_stream(&request).await.unwrap().collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().response, "Par");
    match &items[1] {
        Err(OllamaError::Model(message)) => assert!(message.contains("unexpectedly stopped")),
        other => panic!("unexpected item: {:?}", other.as_ref().map(|r| &r.response)),
    }
}

#[tokio::test]
async fn test_malformed_body_is_a_json_error() {
    let client = OllamaClient::new(spawn_fake_ollama().await).unwrap();
    let request = GenerateRequest::new("garbled", "hi");

    let err = client.generate(&request).await.unwrap_err();
    assert!(matches!(err, OllamaError::Json(_)));
}

#[tokio::test]
async fn test_stalled_stream_times_out() {
    let client = OllamaClient::with_timeouts(
        spawn_fake_ollama().await,
        Duration::from_millis(300),
        Duration::from_secs(1),
    )
    .unwrap();
    let request = GenerateRequest::new("stalls", "hi");

    let items: Vec<_> = tokio::time::timeout(
        Duration::from_secs(10),
        client.generate_stream(&request).await.unwrap().collect::<Vec<_>>(),
    )
    .await
    .expect("stream hung on a stalled server");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().response, "Hel");
    assert!(matches!(items[1], Err(OllamaError::Timeout(_))));
}

fn chat_context(base_url: String, stream: bool) -> ChatContext {
    ChatContext {
        client: OllamaClient::new(base_url).unwrap(),
        model: "llama3".to_string(),
        stream,
        temperature: 0.7,
        max_tokens: 128,
    }
}

#[tokio::test]
async fn test_respond_streams_text_and_returns_final_context() {
    let context = chat_context(spawn_fake_ollama().await, true);
    let mut out = Vec::new();

    let next = context.respond(&mut out, "hi", None, None).await.unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "Hello\n");
    assert_eq!(next, Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_respond_without_streaming_writes_whole_answer() {
    let context = chat_context(spawn_fake_ollama().await, false);
    let mut out = Vec::new();

    let next = context
        .respond(&mut out, "hi", Some("be brief".to_string()), Some(vec![1, 2, 3]))
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "echo: hi [be brief]\n");
    assert_eq!(next, Some(vec![7, 8]));
}

#[tokio::test]
async fn test_respond_surfaces_mid_stream_errors() {
    let mut context = chat_context(spawn_fake_ollama().await, true);
    context.model = "refuses".to_string();
    let mut out = Vec::new();

    let err = context.respond(&mut out, "hi", None, None).await.unwrap_err();

    assert!(matches!(err, OllamaError::Model(_)));
    assert_eq!(String::from_utf8(out).unwrap(), "Par");
}
