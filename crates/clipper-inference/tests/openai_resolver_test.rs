//! Resolver behaviour against a live HTTP endpoint double.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clipper_core::{AiSource, AnnotationConfig, Error, SummarizationBackend};
use clipper_inference::{AnnotationResolver, OpenAIConfig, OpenAISummarizer};

const SAMPLE: &str = "This is a test. Extra detail follows.";

fn summarizer(server: &MockServer) -> Arc<OpenAISummarizer> {
    let config = OpenAIConfig::default()
        .with_base_url(format!("{}/v1", server.uri()))
        .with_timeout_seconds(5);
    Arc::new(OpenAISummarizer::new(config).unwrap())
}

fn settings(key: &str, use_mock_if_fail: bool) -> AnnotationConfig {
    AnnotationConfig {
        ai_disabled: false,
        use_mock_if_fail,
        api_key: Some(key.to_string()),
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_remote_success_sends_expected_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"summary": "A short test.", "tags": ["Testing", "demo", "sample", "extra"]}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = AnnotationResolver::new(summarizer(&server));
    let a = resolver.resolve(SAMPLE, &settings("sk-test", true)).await;
    assert_eq!(a.source, AiSource::Remote);
    assert_eq!(a.summary, "A short test.");
    assert_eq!(a.tags, vec!["testing", "demo", "sample", "extra"]);
}

#[tokio::test]
async fn test_server_error_without_mock_is_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"message": "overloaded", "type": "server_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = AnnotationResolver::new(summarizer(&server));
    let a = resolver.resolve(SAMPLE, &settings("sk-test", false)).await;
    assert_eq!(a.source, AiSource::Fallback);
    assert_eq!(a.summary, "This is a test.");
    assert!((3..=5).contains(&a.tags.len()));
}

#[tokio::test]
async fn test_server_error_surfaces_from_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = summarizer(&server)
        .summarize("text", "sk-test")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_garbage_body_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let resolver = AnnotationResolver::new(summarizer(&server));
    let a = resolver.resolve(SAMPLE, &settings("sk-test", true)).await;
    assert_eq!(a.source, AiSource::Mock);
}

#[tokio::test]
async fn test_wrapped_json_reply_is_recovered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Here you go: {\"summary\": \"Recovered.\", \"tags\": [\"one\"]} Thanks!",
        )))
        .mount(&server)
        .await;

    let resolver = AnnotationResolver::new(summarizer(&server));
    let a = resolver.resolve(SAMPLE, &settings("sk-test", true)).await;
    assert_eq!(a.source, AiSource::Remote);
    assert_eq!(a.summary, "Recovered.");
    assert_eq!(a.tags, vec!["one", "this", "test"]);
}

#[tokio::test]
async fn test_disabled_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = AnnotationResolver::new(summarizer(&server));
    let config = AnnotationConfig {
        ai_disabled: true,
        ..settings("sk-test", true)
    };
    let a = resolver.resolve(SAMPLE, &config).await;
    assert_eq!(a.source, AiSource::Disabled);
}

#[tokio::test]
async fn test_missing_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = AnnotationResolver::new(summarizer(&server));
    let a = resolver.resolve(SAMPLE, &settings("", true)).await;
    assert_eq!(a.source, AiSource::Mock);
    assert_eq!(a.summary, "This is a test.");
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_back() {
    let config = OpenAIConfig::default()
        .with_base_url("http://127.0.0.1:9/v1")
        .with_timeout_seconds(2);
    let resolver = AnnotationResolver::new(Arc::new(OpenAISummarizer::new(config).unwrap()));
    let a = resolver.resolve(SAMPLE, &settings("sk-test", false)).await;
    assert_eq!(a.source, AiSource::Fallback);
}
