//! Gemini client tests against a local wiremock server.

use relay_service::models::Part;
use relay_service::services::providers::gemini::{GeminiClient, GeminiConfig};
use relay_service::services::providers::{GenerativeModel, ProviderError, SafetyPolicy};
use secrecy::Secret;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";
const GENERATE_PATH: &str = "/models/gemini-test:generateContent";

fn config(base_url: &str, api_key: &str) -> GeminiConfig {
    GeminiConfig {
        api_key: Secret::new(api_key.to_string()),
        model: MODEL.to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// Server that accepts the session check for `test-key`.
async fn session_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/gemini-test"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/gemini-test"
        })))
        .mount(&server)
        .await;
    server
}

async fn connect(server: &MockServer) -> GeminiClient {
    GeminiClient::connect(config(&server.uri(), "test-key"), SafetyPolicy::default())
        .await
        .expect("session should be established")
}

fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 4,
            "candidatesTokenCount": 2,
            "totalTokenCount": 6
        }
    })
}

#[tokio::test]
async fn generate_sends_prompt_model_and_safety_policy_once() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "a dragon" }] }],
            "safetySettings": [{
                "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT",
                "threshold": "BLOCK_NONE"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Hello")))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert_eq!(client.model(), MODEL);
    assert_eq!(client.safety_policy(), &SafetyPolicy::default());

    let result = client.generate("a dragon").await.unwrap();

    assert_eq!(result.first_part(), Some(&Part::Text("Hello".to_string())));
    assert_eq!(result.usage.unwrap().total_tokens, 6);
}

#[tokio::test]
async fn empty_prompt_is_forwarded_unchanged() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("...")))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    client.generate("").await.unwrap();
}

#[tokio::test]
async fn invalid_key_fails_session_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/gemini-test"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "API key not valid." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = GeminiClient::connect(config(&server.uri(), "bad-key"), SafetyPolicy::default())
        .await
        .unwrap_err();

    match err {
        ProviderError::ApiError(message) => {
            assert!(message.contains("400"));
            assert!(message.contains("API key not valid"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_key_is_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = GeminiClient::connect(config(&server.uri(), "  "), SafetyPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

#[tokio::test]
async fn unreachable_provider_fails_connect() {
    let err = GeminiClient::connect(config("http://127.0.0.1:1", "test-key"), SafetyPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NetworkError(_)));
}

#[tokio::test]
async fn too_many_requests_is_rate_limited() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let err = client.generate("hi").await.unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn provider_errors_are_not_retried() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let err = client.generate("hi").await.unwrap_err();

    match err {
        ProviderError::ApiError(message) => assert!(message.contains("500")),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn undecodable_body_is_api_error() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let err = client.generate("hi").await.unwrap_err();

    match err {
        ProviderError::ApiError(message) => assert!(message.contains("Failed to parse")),
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn blocked_prompt_returns_no_candidates() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let result = client.generate("something unsafe").await.unwrap();

    assert!(result.first_part().is_none());
    assert_eq!(result.block_reason(), Some("SAFETY"));
}

#[tokio::test]
async fn closed_session_rejects_calls() {
    let server = session_server().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("x")))
        .expect(0)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    assert!(client.is_open());

    client.close().await.unwrap();
    assert!(!client.is_open());

    assert!(matches!(
        client.generate("hi").await.unwrap_err(),
        ProviderError::Closed
    ));
    assert!(matches!(
        client.close().await.unwrap_err(),
        ProviderError::Closed
    ));
}
