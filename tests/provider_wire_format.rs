//! End-to-end adapter tests against a mock HTTP server: each adapter is
//! pointed at a `wiremock` instance standing in for the real provider, so
//! these exercise the actual request/response wire translation rather than
//! just the in-process helpers unit tests cover.

use arcllm::{ContentBlock, Message, MessageContent, Role, StopReason, Tool, ToolResultContent};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arcllm::core::providers::{AdapterBase, AnthropicAdapter, OpenAiAdapter, Quirks};
use arcllm::core::Provider;

fn anthropic_adapter(base_url: &str) -> AnthropicAdapter {
    let base = AdapterBase::new(
        "anthropic",
        "claude-sonnet",
        base_url,
        "sk-test".to_string(),
        None,
    )
    .unwrap();
    AnthropicAdapter::new(base)
}

fn openai_adapter(base_url: &str) -> OpenAiAdapter {
    let base =
        AdapterBase::new("openai", "gpt-4o", base_url, "sk-test".to_string(), None).unwrap();
    OpenAiAdapter::new(base)
}

#[tokio::test]
async fn canonical_anthropic_text_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "claude-sonnet",
            "stop_reason": "end_turn",
            "content": [{"type": "text", "text": "4"}],
            "usage": {"input_tokens": 12, "output_tokens": 4},
        })))
        .mount(&server)
        .await;

    let adapter = anthropic_adapter(&server.uri());
    let response = adapter
        .invoke(vec![Message::user("What is 2 + 2?")], None, None)
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("4"));
    assert!(response.tool_calls.is_empty());
    assert_eq!(response.usage.input_tokens, 12);
    assert_eq!(response.usage.output_tokens, 4);
    assert_eq!(response.usage.total_tokens, 16);
    assert_eq!(response.stop_reason, StopReason::EndTurn);
}

#[tokio::test]
async fn openai_tool_call_parse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search", "arguments": "{\"q\":\"cats\"}"},
                    }],
                },
                "finish_reason": "tool_calls",
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
        })))
        .mount(&server)
        .await;

    let adapter = openai_adapter(&server.uri());
    let tools = vec![Tool {
        name: "search".into(),
        description: "search the web".into(),
        parameters: serde_json::from_value(json!({"type": "object"})).unwrap(),
    }];
    let response = adapter
        .invoke(vec![Message::user("find cats")], Some(tools), None)
        .await
        .unwrap();

    assert_eq!(response.content, None);
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "call_1");
    assert_eq!(response.tool_calls[0].name, "search");
    assert_eq!(
        response.tool_calls[0].arguments.get("q").and_then(|v| v.as_str()),
        Some("cats")
    );
    assert_eq!(response.stop_reason, StopReason::ToolUse);
    assert_eq!(response.usage.input_tokens, 10);
    assert_eq!(response.usage.output_tokens, 5);
    assert_eq!(response.usage.total_tokens, 15);
}

#[tokio::test]
async fn openai_tool_result_flattening_sends_one_message_per_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "tool", "tool_call_id": "t1", "content": "42"},
                {"role": "tool", "tool_call_id": "t2", "content": "hi"},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
        })))
        .mount(&server)
        .await;

    let adapter = openai_adapter(&server.uri());
    let tool_result_message = Message::new(
        Role::Tool,
        MessageContent::Blocks(vec![
            ContentBlock::ToolResult {
                tool_use_id: "t1".into(),
                content: ToolResultContent::Text("42".into()),
            },
            ContentBlock::ToolResult {
                tool_use_id: "t2".into(),
                content: ToolResultContent::Text("hi".into()),
            },
        ]),
    );

    let response = adapter.invoke(vec![tool_result_message], None, None).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("ok"));
}

#[tokio::test]
async fn mistral_tool_choice_required_becomes_any_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "mistral-large",
            "messages": [{"role": "user", "content": "hi"}],
            "tool_choice": "any",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
        })))
        .mount(&server)
        .await;

    let base = AdapterBase::new(
        "mistral",
        "mistral-large",
        &server.uri(),
        "sk-test".to_string(),
        None,
    )
    .unwrap();
    let adapter = OpenAiAdapter::new(base).with_quirks(Quirks {
        tool_choice_required_as_any: true,
        extra_length_finish_reason: Some("model_length"),
    });

    let response = adapter
        .invoke(
            vec![Message::user("hi")],
            None,
            Some(json!({"tool_choice": "required"})),
        )
        .await
        .unwrap();
    assert_eq!(response.content.as_deref(), Some("ok"));
}
