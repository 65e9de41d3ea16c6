//! HTTP-level tests for the OpenAI-compatible backend, against a local mock
//! server.

use std::time::Duration;

use hearth_core::emotion::EmotionVector;
use hearth_core::types::Role;
use hearth_llm::{ChatBackend, ChatMessage, LlmClient, LlmClientConfig, LlmError, OpenAiChatBackend};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> LlmClientConfig {
    LlmClientConfig {
        base_url: format!("{}/v1", server.uri()),
        model: "test-model".into(),
        api_key: "placeholder".into(),
        timeout: Duration::from_secs(5),
        retry_max: 1,
        ..LlmClientConfig::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
    })
}

#[tokio::test]
async fn posts_openai_request_and_trims_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer placeholder"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "hello"}],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  hi there \n")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiChatBackend::new(config_for(&server)).expect("backend");
    let text = backend
        .complete(&[ChatMessage::system("sys"), ChatMessage::user("hello")])
        .await
        .expect("completion");
    assert_eq!(text, "hi there");
}

#[tokio::test]
async fn error_status_is_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let backend = OpenAiChatBackend::new(config_for(&server)).expect("backend");
    let err = backend.complete(&[ChatMessage::user("x")]).await.expect_err("should fail");
    match err {
        LlmError::RequestFailed(msg) => {
            assert!(msg.contains("500"), "{msg}");
            assert!(msg.contains("model not loaded"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn envelope_without_choices_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
        .mount(&server)
        .await;

    let backend = OpenAiChatBackend::new(config_for(&server)).expect("backend");
    let err = backend.complete(&[ChatMessage::user("x")]).await.expect_err("should fail");
    assert!(matches!(err, LlmError::ParseError(_)), "{err:?}");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = LlmClientConfig {
        timeout: Duration::from_millis(200),
        ..config_for(&server)
    };
    let client = LlmClient::openai(config).expect("client");
    let err = client.chat("sys", &[]).await.expect_err("should time out");
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    let config = LlmClientConfig {
        base_url: "http://127.0.0.1:9/v1".into(),
        timeout: Duration::from_secs(2),
        retry_max: 1,
        ..LlmClientConfig::default()
    };
    let backend = OpenAiChatBackend::new(config).expect("backend");
    let err = backend.complete(&[ChatMessage::user("x")]).await.expect_err("should fail");
    assert!(matches!(err, LlmError::Unavailable(_) | LlmError::RequestFailed(_)), "{err:?}");
}

#[tokio::test]
async fn structured_turn_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"utterance":"hi there","emotion":{"joy":80},"actions":[]}"#,
        )))
        .mount(&server)
        .await;

    let client = LlmClient::openai(config_for(&server)).expect("client");
    let reply = client
        .chat_with_emotion("persona", &[(Role::User, "hello".to_string())], &EmotionVector::neutral())
        .await
        .expect("reply");
    assert_eq!(reply.utterance, "hi there");
    assert_eq!(reply.emotion.joy, 80);
    assert_eq!(reply.emotion.trust, 50);
    assert!(reply.actions.is_empty());

    let requests = server.received_requests().await.expect("recorded");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let user = body["messages"][1]["content"].as_str().expect("user content");
    let payload: serde_json::Value = serde_json::from_str(user).expect("payload");
    assert_eq!(payload["instruction"], "character_roleplay");
    assert_eq!(payload["conversation"][0]["role"], "user");
}
