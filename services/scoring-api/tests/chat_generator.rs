use serde_json::json;
use shared::llm::{ChatGenerator, LlmError, TextGenerator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"content": "{\"intent\":\"High\",\"reasoning\":\"fit\"}"}},
                {"message": {"content": "ignored"}}
            ]
        })))
        .mount(&server)
        .await;

    let generator = ChatGenerator::new(server.uri(), "test-key", "gpt-4o-mini").unwrap();
    let text = generator.generate("classify this lead").await.unwrap();
    assert_eq!(text, "{\"intent\":\"High\",\"reasoning\":\"fit\"}");
}

#[tokio::test]
async fn empty_choices_yield_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let generator = ChatGenerator::new(server.uri(), "k", "m").unwrap();
    assert_eq!(generator.generate("p").await.unwrap(), "");
}

#[tokio::test]
async fn server_error_maps_to_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let generator = ChatGenerator::new(server.uri(), "k", "m").unwrap();
    match generator.generate("p").await {
        Err(LlmError::Http(500)) => {}
        other => panic!("expected Http(500), got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_maps_to_network_error() {
    // nothing listens on this port
    let generator = ChatGenerator::new("http://127.0.0.1:9", "k", "m").unwrap();
    match generator.generate("p").await {
        Err(LlmError::Network(_)) => {}
        other => panic!("expected Network error, got {other:?}"),
    }
}
