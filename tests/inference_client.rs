//! Inference client against a mocked Ollama runtime.

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use legalcheck::llm::{Inference, LlmClient, LlmConfig, LlmError, AVAILABILITY_TIMEOUT};
use legalcheck::rate_limit::{RateLimitConfig, RateLimitError, RateLimiter};
use legalcheck::sanitize::is_clean;

fn config(server: &MockServer) -> LlmConfig {
    LlmConfig::default().with_endpoint(&server.uri())
}

async fn mount_reply(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3:8b",
            "response": reply,
            "done": true
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_generate_sends_non_streaming_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3:8b", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": " The case exists. "})))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config(&server)).unwrap();
    let text = client.generate("Is 347 U.S. 483 real?").await.unwrap();
    assert_eq!(text, "The case exists.");
}

#[tokio::test]
async fn test_output_is_sanitized() {
    let server = MockServer::start().await;
    mount_reply(
        &server,
        "\u{1b}[31mRISK:\u{1b}[0m high\u{0007}\r\nCONFIDENCE: 10\u{202E}",
    )
    .await;

    let client = LlmClient::new(config(&server)).unwrap();
    let text = client.generate("prompt").await.unwrap();
    assert_eq!(text, "RISK: high\nCONFIDENCE: 10");
    assert!(is_clean(&text));
}

#[tokio::test]
async fn test_empty_response_is_parse_error() {
    let server = MockServer::start().await;
    mount_reply(&server, "  \u{0000}  ").await;

    let client = LlmClient::new(config(&server)).unwrap();
    let err = client.generate("prompt").await.unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)));
}

#[tokio::test]
async fn test_slow_inference_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "too late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(config(&server).with_timeout_seconds(1)).unwrap();
    let err = client.generate("prompt").await.unwrap_err();
    assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_secs(1)));
}

#[tokio::test]
async fn test_http_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'nope' not found"))
        .mount(&server)
        .await;

    let client = LlmClient::new(config(&server).with_model("nope")).unwrap();
    match client.generate("prompt").await.unwrap_err() {
        LlmError::Api(msg) => {
            assert!(msg.contains("404"));
            assert!(msg.contains("not found"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_requests_beyond_limit_are_throttled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
        .expect(2)
        .mount(&server)
        .await;

    let limiter = RateLimiter::with_config(
        RateLimitConfig::per_minute(2).with_max_wait(Duration::from_millis(50)),
    );
    let client = LlmClient::with_rate_limiter(config(&server), limiter).unwrap();

    client.generate("one").await.unwrap();
    client.generate("two").await.unwrap();
    let err = client.generate("three").await.unwrap_err();
    assert!(matches!(
        err,
        LlmError::RateLimited(RateLimitError::Throttled { .. })
    ));

    let stats = client.rate_limiter().stats().await;
    let host = stats.values().next().unwrap();
    assert_eq!(host.total_requests, 2);
    assert_eq!(host.throttled, 1);
}

#[tokio::test]
async fn test_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:8b"}, {"name": "mistral:7b"}]
        })))
        .mount(&server)
        .await;

    let client = LlmClient::new(config(&server)).unwrap();
    assert!(client.is_available().await);
    assert_eq!(
        client.list_models().await.unwrap(),
        vec!["llama3:8b".to_string(), "mistral:7b".to_string()]
    );
}

#[tokio::test]
async fn test_unreachable_runtime() {
    let client = LlmClient::new(LlmConfig::default().with_endpoint("http://127.0.0.1:9")).unwrap();
    assert!(!client.is_available().await);
    assert!(matches!(
        client.generate("prompt").await.unwrap_err(),
        LlmError::Connection(_)
    ));
}

#[tokio::test]
async fn test_hung_runtime_reported_unavailable_quickly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"models": []}))
                .set_delay(AVAILABILITY_TIMEOUT + Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = LlmClient::new(config(&server)).unwrap();
    assert_eq!(client.config().timeout_seconds, 120);

    let started = Instant::now();
    assert!(!client.is_available().await);
    assert!(started.elapsed() < AVAILABILITY_TIMEOUT + Duration::from_secs(3));
}
