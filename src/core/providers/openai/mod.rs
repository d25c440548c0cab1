//! The OpenAI Chat Completions adapter, shared by OpenAI itself and every
//! near-variant provider in `variants` — they differ only in base URL,
//! model catalog, and a handful of named quirks captured in `Quirks`.

pub mod variants;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{ArcLlmError, ParseError, Result};
use crate::types::{
    ContentBlock, LLMResponse, Message, MessageContent, Role, StopReason, Tool, ToolCall,
    ToolResultContent, Usage,
};

use super::base::AdapterBase;
use crate::core::traits::Provider;

/// Per-variant deviations from stock OpenAI Chat Completions semantics.
/// Every field defaults to "behave like OpenAI"; a variant only sets what
/// it actually changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quirks {
    /// Mistral rejects `tool_choice: "required"` and wants `"any"` instead.
    pub tool_choice_required_as_any: bool,
    /// Mistral's Chat Completions endpoint reports truncation as
    /// `"model_length"` rather than the standard `"length"`.
    pub extra_length_finish_reason: Option<&'static str>,
}

#[derive(Debug)]
pub struct OpenAiAdapter {
    base: AdapterBase,
    pub(crate) quirks: Quirks,
    chat_completions_path: &'static str,
}

impl OpenAiAdapter {
    pub fn new(base: AdapterBase) -> Self {
        Self {
            base,
            quirks: Quirks::default(),
            chat_completions_path: "/v1/chat/completions",
        }
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_chat_completions_path(mut self, path: &'static str) -> Self {
        self.chat_completions_path = path;
        self
    }

    fn role_to_wire(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn content_to_wire(content: &MessageContent) -> Value {
        match content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Blocks(blocks) => {
                // A plain assistant/user turn with only text blocks collapses
                // to a string; anything richer (images) becomes the
                // multi-part content array OpenAI expects.
                if blocks.iter().all(|b| matches!(b, ContentBlock::Text { .. })) {
                    let joined: String = blocks
                        .iter()
                        .filter_map(ContentBlock::as_text)
                        .collect::<Vec<_>>()
                        .join("");
                    Value::String(joined)
                } else {
                    Value::Array(
                        blocks
                            .iter()
                            .map(|block| match block {
                                ContentBlock::Text { text } => {
                                    json!({"type": "text", "text": text})
                                }
                                ContentBlock::Image { source, media_type } => json!({
                                    "type": "image_url",
                                    "image_url": {"url": format!("data:{media_type};base64,{source}")},
                                }),
                                _ => Value::Null,
                            })
                            .collect(),
                    )
                }
            }
        }
    }

    /// Expands one canonical message into one or more OpenAI-format
    /// messages. Assistant messages carrying `tool_use` blocks gain a
    /// `tool_calls` array (arguments re-stringified — the one wire format
    /// that wants JSON-as-a-string). A `tool` message carrying multiple
    /// `tool_result` blocks expands into one OpenAI message per block,
    /// since the wire format allows exactly one `tool_call_id` per message.
    fn message_to_wire(message: &Message) -> Vec<Value> {
        if message.role == Role::Tool {
            return Self::tool_result_messages_to_wire(&message.content);
        }

        let mut tool_calls = Vec::new();
        let text_only_content = match &message.content {
            MessageContent::Blocks(blocks)
                if blocks.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. })) =>
            {
                let mut text_blocks = Vec::new();
                for block in blocks {
                    match block {
                        ContentBlock::ToolUse { id, name, arguments } => {
                            tool_calls.push(json!({
                                "id": id,
                                "type": "function",
                                "function": {
                                    "name": name,
                                    "arguments": Value::Object(arguments.clone()).to_string(),
                                },
                            }));
                        }
                        other => text_blocks.push(other.clone()),
                    }
                }
                Some(MessageContent::Blocks(text_blocks))
            }
            _ => None,
        };

        let content = text_only_content.as_ref().unwrap_or(&message.content);
        let mut wire = json!({
            "role": Self::role_to_wire(message.role),
            "content": Self::content_to_wire(content),
        });

        if !tool_calls.is_empty() {
            wire["tool_calls"] = Value::Array(tool_calls);
            // An assistant turn that is pure tool-calls has no content.
            if matches!(content, MessageContent::Blocks(b) if b.is_empty()) {
                wire["content"] = Value::Null;
            }
        }

        vec![wire]
    }

    fn tool_result_messages_to_wire(content: &MessageContent) -> Vec<Value> {
        let blocks = match content {
            MessageContent::Blocks(blocks) => blocks.clone(),
            MessageContent::Text(text) => {
                return vec![json!({"role": "tool", "content": text})];
            }
        };

        blocks
            .into_iter()
            .map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, content } => {
                    let text = match content {
                        ToolResultContent::Text(text) => text,
                        ToolResultContent::Blocks(blocks) => blocks
                            .iter()
                            .filter_map(ContentBlock::as_text)
                            .collect::<Vec<_>>()
                            .join(""),
                    };
                    json!({"role": "tool", "tool_call_id": tool_use_id, "content": text})
                }
                other => json!({"role": "tool", "content": other.as_text().unwrap_or("")}),
            })
            .collect()
    }

    fn tool_to_wire(tool: &Tool) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": Value::Object(tool.parameters.clone()),
            },
        })
    }

    fn finish_reason_from_wire(&self, raw: &str) -> StopReason {
        if let Some(extra) = self.quirks.extra_length_finish_reason {
            if raw == extra {
                return StopReason::MaxTokens;
            }
        }
        match raw {
            "length" => StopReason::MaxTokens,
            "tool_calls" | "function_call" => StopReason::ToolUse,
            "stop" => StopReason::EndTurn,
            _ => StopReason::EndTurn,
        }
    }

    fn parse_tool_call_arguments(raw: &str) -> Result<Map<String, Value>> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ArcLlmError::Parse(ParseError {
                raw: raw.to_string(),
                source_message: "tool-call arguments must parse as a JSON object".to_string(),
            })),
        }
    }

    fn parse_response(&self, body: Value) -> Result<LLMResponse> {
        let model = body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&self.base.model_name)
            .to_string();

        let choice = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .cloned()
            .unwrap_or(Value::Null);

        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(|r| self.finish_reason_from_wire(r))
            .unwrap_or(StopReason::EndTurn);

        let message = choice.get("message").cloned().unwrap_or(Value::Null);
        let content = message
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                let id = call.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
                let function = call.get("function").cloned().unwrap_or(Value::Null);
                let name = function
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let raw_arguments = function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or("{}");
                let arguments = Self::parse_tool_call_arguments(raw_arguments)?;
                tool_calls.push(ToolCall { id, name, arguments });
            }
        }

        let usage_raw = body.get("usage").cloned().unwrap_or(Value::Null);
        let input_tokens = usage_raw.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
        let output_tokens = usage_raw
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let total_tokens = usage_raw
            .get("total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(input_tokens + output_tokens);
        let reasoning_tokens = usage_raw
            .get("completion_tokens_details")
            .and_then(|d| d.get("reasoning_tokens"))
            .and_then(Value::as_u64);
        let cache_read_tokens = usage_raw
            .get("prompt_tokens_details")
            .and_then(|d| d.get("cached_tokens"))
            .and_then(Value::as_u64);

        let usage = Usage {
            input_tokens,
            output_tokens,
            total_tokens,
            cache_read_tokens,
            cache_write_tokens: None,
            reasoning_tokens,
        };

        Ok(LLMResponse {
            content,
            tool_calls,
            usage,
            model,
            stop_reason: finish_reason,
            thinking: None,
            raw: body,
            metadata: None,
        })
    }
}

#[async_trait]
impl Provider for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.base.provider_name
    }

    fn model_name(&self) -> &str {
        &self.base.model_name
    }

    async fn invoke(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        extras: Option<Value>,
    ) -> Result<LLMResponse> {
        let wire_messages: Vec<Value> = messages.iter().flat_map(Self::message_to_wire).collect();

        let mut body = json!({
            "model": self.base.model_name,
            "messages": wire_messages,
        });

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = Value::Array(tools.iter().map(Self::tool_to_wire).collect());
        }

        if let Some(Value::Object(mut extra_fields)) = extras {
            if self.quirks.tool_choice_required_as_any {
                if let Some(Value::String(choice)) = extra_fields.get("tool_choice") {
                    if choice == "required" {
                        extra_fields.insert("tool_choice".to_string(), json!("any"));
                    }
                }
            }
            let obj = body.as_object_mut().expect("body is always an object");
            for (key, value) in extra_fields {
                obj.insert(key, value);
            }
        }

        let mut request = self
            .base
            .client()
            .post(self.base.endpoint(self.chat_completions_path))
            .header("content-type", "application/json");

        if !self.base.secret.is_empty() {
            request = request.header("authorization", format!("Bearer {}", self.base.secret));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| self.base.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response.text().await.unwrap_or_default();
            return Err(ArcLlmError::Api(
                self.base
                    .classify_error_response(status.as_u16(), text, retry_after.as_deref()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.base.map_transport_error(e))?;

        self.parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map as JsonMap;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(
            AdapterBase::new("openai", "gpt-4o", "https://api.openai.com", "sk-test".into(), None)
                .unwrap(),
        )
    }

    #[test]
    fn finish_reason_maps_standard_values() {
        let a = adapter();
        assert_eq!(a.finish_reason_from_wire("stop"), StopReason::EndTurn);
        assert_eq!(a.finish_reason_from_wire("length"), StopReason::MaxTokens);
        assert_eq!(a.finish_reason_from_wire("tool_calls"), StopReason::ToolUse);
    }

    #[test]
    fn mistral_quirk_maps_model_length_to_max_tokens() {
        let a = adapter().with_quirks(Quirks {
            tool_choice_required_as_any: true,
            extra_length_finish_reason: Some("model_length"),
        });
        assert_eq!(a.finish_reason_from_wire("model_length"), StopReason::MaxTokens);
        assert_eq!(a.finish_reason_from_wire("length"), StopReason::MaxTokens);
    }

    #[test]
    fn tool_call_arguments_must_parse_as_object() {
        assert!(OpenAiAdapter::parse_tool_call_arguments(r#"{"q": 1}"#).is_ok());
        assert!(OpenAiAdapter::parse_tool_call_arguments("not json").is_err());
        assert!(OpenAiAdapter::parse_tool_call_arguments("[1,2]").is_err());
    }

    #[test]
    fn assistant_tool_use_message_expands_to_tool_calls_with_stringified_arguments() {
        let mut args = JsonMap::new();
        args.insert("q".to_string(), Value::String("cats".to_string()));
        let message = Message::new(
            Role::Assistant,
            MessageContent::Blocks(vec![ContentBlock::ToolUse {
                id: "call_1".into(),
                name: "search".into(),
                arguments: args,
            }]),
        );
        let wire = OpenAiAdapter::message_to_wire(&message);
        assert_eq!(wire.len(), 1);
        let call = &wire[0]["tool_calls"][0];
        assert_eq!(call["function"]["name"], "search");
        assert!(call["function"]["arguments"].as_str().unwrap().contains("cats"));
    }

    #[test]
    fn tool_message_with_multiple_results_expands_to_multiple_messages() {
        let message = Message::new(
            Role::Tool,
            MessageContent::Blocks(vec![
                ContentBlock::ToolResult {
                    tool_use_id: "call_1".into(),
                    content: ToolResultContent::Text("result one".into()),
                },
                ContentBlock::ToolResult {
                    tool_use_id: "call_2".into(),
                    content: ToolResultContent::Text("result two".into()),
                },
            ]),
        );
        let wire = OpenAiAdapter::message_to_wire(&message);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["tool_call_id"], "call_1");
        assert_eq!(wire[1]["tool_call_id"], "call_2");
    }

    #[test]
    fn empty_secret_omits_authorization_header() {
        let a = OpenAiAdapter::new(
            AdapterBase::new("ollama", "llama3", "http://localhost:11434", String::new(), None)
                .unwrap(),
        );
        assert!(a.base.secret.is_empty());
    }
}
