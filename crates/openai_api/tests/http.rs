use openai_api::{
    normalize_chat_completions_url, ChatCompletionRequest, ChatMessage, OpenAiApiClient,
    OpenAiApiConfig, OpenAiApiError,
};
use serde_json::Value;

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("gpt-3.5-turbo-0301", vec![ChatMessage::new("user", "payload")])
}

#[test]
fn http_request_targets_chat_completions_endpoint() {
    let config = OpenAiApiConfig::new("sk-test").with_base_url("https://proxy.local/v1");
    let client = OpenAiApiClient::new(config).expect("client");

    let http_request = client
        .build_request(&request(), true)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(
        http_request.url().as_str(),
        normalize_chat_completions_url("https://proxy.local/v1")
    );
    assert_eq!(http_request.method(), "POST");
    assert_eq!(
        http_request
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok()),
        Some("Bearer sk-test")
    );

    let body = http_request
        .body()
        .and_then(|body| body.as_bytes())
        .expect("json body is buffered");
    let body: Value = serde_json::from_slice(body).expect("body is json");
    assert_eq!(body["stream"], Value::Bool(true));
    assert_eq!(body["stream_options"]["include_usage"], Value::Bool(true));
}

#[test]
fn http_request_fails_without_api_key() {
    let client = OpenAiApiClient::new(OpenAiApiConfig::default()).expect("client");
    let error = client
        .build_request(&request(), false)
        .expect_err("missing key");
    assert!(matches!(error, OpenAiApiError::MissingApiKey));
}
