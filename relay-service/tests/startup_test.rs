//! End-to-end startup tests: real listener, Gemini replaced by wiremock.

use relay_service::config::RelayConfig;
use relay_service::startup::Application;
use reqwest::Client;
use serde_json::json;
use service_core::config::Config;
use service_core::error::AppError;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn relay_config(server: &MockServer, vars: &[(&str, &str)]) -> RelayConfig {
    let mut env: HashMap<String, String> = HashMap::from([
        ("GEMINI_API_KEY".to_string(), "test-key".to_string()),
        ("GEMINI_MODEL".to_string(), "gemini-test".to_string()),
        ("GEMINI_API_BASE".to_string(), server.uri()),
        ("GEMINI_TIMEOUT_SECS".to_string(), "5".to_string()),
    ]);
    for (key, value) in vars {
        env.insert(key.to_string(), value.to_string());
    }

    let common = Config {
        port: 0,
        host: "127.0.0.1".to_string(),
    };
    RelayConfig::from_lookup(common, |key| env.get(key).cloned()).expect("valid test config")
}

async fn mount_session(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/models/gemini-test"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn mount_generate(server: &MockServer, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn invalid_credential_prevents_startup() {
    let server = MockServer::start().await;
    mount_session(&server, 403).await;
    mount_generate(&server, ResponseTemplate::new(200), 0).await;

    let result = Application::build(relay_config(&server, &[])).await;

    assert!(matches!(result, Err(AppError::BadGateway(_))));
}

#[tokio::test]
async fn empty_credential_is_a_configuration_error() {
    let server = MockServer::start().await;

    let result = Application::build(relay_config(&server, &[("GEMINI_API_KEY", "")])).await;

    assert!(matches!(result, Err(AppError::ConfigError(_))));
}

#[tokio::test]
async fn serves_story_and_stops_cleanly() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    mount_generate(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Line one\nLine two" }] },
                "finishReason": "STOP"
            }]
        })),
        1,
    )
    .await;

    let app = Application::build(relay_config(&server, &[]))
        .await
        .expect("application builds");
    let port = app.port();
    let trigger = app.shutdown_trigger();
    let running = tokio::spawn(app.run_until_stopped());

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/ai", port))
        .form(&[("chat-prompt", "tell me a story")])
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains(r#""Line one<br />Line two""#));
    drop(client);

    trigger.request_stop();
    let outcome = running.await.expect("server task joins");
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn fatal_mode_stops_server_with_error() {
    let server = MockServer::start().await;
    mount_session(&server, 200).await;
    mount_generate(&server, ResponseTemplate::new(503), 1).await;

    let app = Application::build(relay_config(
        &server,
        &[("RELAY_FATAL_ON_GENERATION_ERROR", "true")],
    ))
    .await
    .expect("application builds");
    let port = app.port();
    let running = tokio::spawn(app.run_until_stopped());

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/ai", port))
        .form(&[("chat-prompt", "hi")])
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status().as_u16(), 502);
    drop(response);

    let outcome = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server stops on its own")
        .expect("server task joins");
    assert!(matches!(outcome, Err(AppError::InternalError(_))));
}
