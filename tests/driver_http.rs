// End-to-end streaming over real HTTP.
//
// Uses wiremock as the upstream server and the reqwest-backed transport, so
// the full path from socket bytes to conversation history is exercised.

use chat_stream::{
    config::{ModelProfile, ProviderType},
    messages::ChatMessage,
    services::{
        driver::RecordingSink,
        openai,
        streaming::OpenAIStreamAdapter,
        transport::ReqwestTransport,
    },
    CanonicalEvent, Conversation, StreamDriver, StreamOutcome, TurnOutcome,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

fn driver() -> StreamDriver {
    StreamDriver::new(ReqwestTransport::new().unwrap())
}

fn contents(conversation: &Conversation) -> Vec<String> {
    conversation
        .history()
        .iter()
        .map(|message| message.content().to_string())
        .collect()
}

#[tokio::test]
async fn test_openai_turn_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(sse(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let profile = ModelProfile::new("GPT", ProviderType::OpenAI, "gpt-4o", "sk-test")
        .with_base_url(format!("{}/v1", mock_server.uri()));
    let mut conversation = Conversation::new();

    let mut events = Vec::new();
    let outcome = conversation
        .send("Hi", &driver(), &profile, &CancellationToken::new(), |event| {
            events.push(event.clone());
        })
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(
        events,
        vec![CanonicalEvent::text("Hel"), CanonicalEvent::text("lo")]
    );
    assert_eq!(contents(&conversation), vec!["Hi", "Hello"]);
}

#[tokio::test]
async fn test_anthropic_tool_and_text_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(sse(concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"lookup\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"q\\\":1}\"}}\n\n",
            "event: content_block_stop\n",
            "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Found it\"}}\n\n",
            "event: ping\n",
            "data: {\"type\":\"ping\"}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        )))
        .mount(&mock_server)
        .await;

    let profile = ModelProfile::new("Claude", ProviderType::Anthropic, "claude", "sk-ant")
        .with_base_url(mock_server.uri());
    let mut conversation = Conversation::new();

    let mut events = Vec::new();
    let outcome = conversation
        .send("Look it up", &driver(), &profile, &CancellationToken::new(), |event| {
            events.push(event.clone());
        })
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(
        events,
        vec![
            CanonicalEvent::ToolStart {
                tool_name: "lookup".into(),
                input: None,
            },
            CanonicalEvent::ToolEnd {
                tool_name: "lookup".into(),
                output: Some("{\"q\":1}".into()),
            },
            CanonicalEvent::text("Found it"),
        ]
    );
    assert_eq!(contents(&conversation), vec!["Look it up", "Found it"]);
}

#[tokio::test]
async fn test_gemini_stream_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(sse(concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Bon\"}],\"role\":\"model\"}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"jour\"}],\"role\":\"model\"}}]}\r\n\r\n",
        )))
        .mount(&mock_server)
        .await;

    let profile = ModelProfile::new("Gemini", ProviderType::Gemini, "gemini-2.0-flash", "g-key")
        .with_base_url(mock_server.uri());
    let mut conversation = Conversation::new();

    let outcome = conversation
        .send("Hello in French", &driver(), &profile, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(contents(&conversation), vec!["Hello in French", "Bonjour"]);
}

#[tokio::test]
async fn test_error_status_leaves_history_unchanged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(r#"{"error":{"message":"boom"}}"#),
        )
        .mount(&mock_server)
        .await;

    let profile = ModelProfile::new("GPT", ProviderType::OpenAI, "gpt-4o", "sk-test")
        .with_base_url(format!("{}/v1", mock_server.uri()));
    let mut conversation = Conversation::new();

    let outcome = conversation
        .send("Hi", &driver(), &profile, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Failed(message) => {
            assert!(message.contains("500"), "{message}");
            assert!(message.contains("boom"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(conversation.history().is_empty());
}

#[tokio::test]
async fn test_driver_with_recording_sink() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse(concat!(
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"search\",\"arguments\":\"\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"q\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"rust\\\"}\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
            "data: [DONE]\n\n",
        )))
        .mount(&mock_server)
        .await;

    let profile = ModelProfile::new("GPT", ProviderType::OpenAI, "gpt-4o", "sk-test")
        .with_base_url(format!("{}/v1", mock_server.uri()));
    let request = openai::build_request(&profile, &[ChatMessage::user("search")], None).unwrap();

    let mut adapter = OpenAIStreamAdapter::new();
    let mut sink = RecordingSink::default();
    let outcome = driver()
        .run(&request, &mut adapter, &mut sink, &CancellationToken::new())
        .await;

    assert_eq!(outcome, StreamOutcome::Completed);
    assert!(sink.completed);
    assert_eq!(
        sink.events,
        vec![
            CanonicalEvent::ToolStart {
                tool_name: "search".into(),
                input: None,
            },
            CanonicalEvent::ToolEnd {
                tool_name: "search".into(),
                output: Some("{\"q\":\"rust\"}".into()),
            },
        ]
    );
}
