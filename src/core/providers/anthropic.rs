//! The Anthropic Messages API adapter — the first of the two genuinely
//! distinct wire formats this crate translates to/from (the other being
//! the OpenAI Chat Completions family in `super::openai`).

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{ArcLlmError, ParseError, Result};
use crate::types::{
    ContentBlock, LLMResponse, Message, MessageContent, Role, StopReason, Tool, ToolCall,
    ToolResultContent, Usage,
};

use super::base::AdapterBase;
use crate::core::traits::Provider;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u64 = 4096;

#[derive(Debug)]
pub struct AnthropicAdapter {
    base: AdapterBase,
}

impl AnthropicAdapter {
    pub fn new(base: AdapterBase) -> Self {
        Self { base }
    }

    /// Anthropic has no system *message*; every system message in the
    /// conversation is extracted and concatenated (newline-joined, in
    /// order) into the top-level `system` field.
    fn split_system(messages: Vec<Message>) -> (Option<String>, Vec<Message>) {
        let mut system_parts = Vec::new();
        let mut rest = Vec::new();
        for message in messages {
            if message.role == Role::System {
                if let Some(text) = message.content.as_text() {
                    system_parts.push(text.to_string());
                }
            } else {
                rest.push(message);
            }
        }
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n"))
        };
        (system, rest)
    }

    fn content_block_to_wire(block: &ContentBlock) -> Value {
        match block {
            ContentBlock::Text { text } => json!({"type": "text", "text": text}),
            ContentBlock::Image { source, media_type } => json!({
                "type": "image",
                "source": {"type": "base64", "media_type": media_type, "data": source},
            }),
            ContentBlock::ToolUse { id, name, arguments } => json!({
                "type": "tool_use",
                "id": id,
                "name": name,
                "input": Value::Object(arguments.clone()),
            }),
            ContentBlock::ToolResult { tool_use_id, content } => {
                let content_value = match content {
                    ToolResultContent::Text(text) => Value::String(text.clone()),
                    ToolResultContent::Blocks(blocks) => {
                        Value::Array(blocks.iter().map(Self::content_block_to_wire).collect())
                    }
                };
                json!({"type": "tool_result", "tool_use_id": tool_use_id, "content": content_value})
            }
        }
    }

    fn message_to_wire(message: &Message) -> Value {
        let role = match message.role {
            Role::User | Role::Tool => "user",
            Role::Assistant => "assistant",
            Role::System => unreachable!("system messages are split out before this point"),
        };
        let content = match &message.content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Blocks(blocks) => {
                Value::Array(blocks.iter().map(Self::content_block_to_wire).collect())
            }
        };
        json!({"role": role, "content": content})
    }

    fn tool_to_wire(tool: &Tool) -> Value {
        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": Value::Object(tool.parameters.clone()),
        })
    }

    fn stop_reason_from_wire(raw: &str) -> StopReason {
        match raw {
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }

    fn parse_response(&self, body: Value) -> Result<LLMResponse> {
        let model = body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&self.base.model_name)
            .to_string();

        let stop_reason = body
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(Self::stop_reason_from_wire)
            .unwrap_or(StopReason::EndTurn);

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();
        if let Some(blocks) = body.get("content").and_then(Value::as_array) {
            for block in blocks {
                match block.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        if let Some(text) = block.get("text").and_then(Value::as_str) {
                            text_parts.push(text.to_string());
                        }
                    }
                    Some("tool_use") => {
                        let id = block
                            .get("id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let name = block
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let arguments = match block.get("input") {
                            Some(Value::Object(map)) => map.clone(),
                            _ => Map::new(),
                        };
                        tool_calls.push(ToolCall { id, name, arguments });
                    }
                    _ => {}
                }
            }
        }

        let usage_raw = body.get("usage").cloned().unwrap_or(Value::Null);
        let input_tokens = usage_raw
            .get("input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let output_tokens = usage_raw
            .get("output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let cache_read_tokens = usage_raw
            .get("cache_read_input_tokens")
            .and_then(Value::as_u64);
        let cache_write_tokens = usage_raw
            .get("cache_creation_input_tokens")
            .and_then(Value::as_u64);

        let usage = Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cache_read_tokens,
            cache_write_tokens,
            reasoning_tokens: None,
        };

        Ok(LLMResponse {
            content: if text_parts.is_empty() {
                None
            } else {
                Some(text_parts.join(""))
            },
            tool_calls,
            usage,
            model,
            stop_reason,
            thinking: None,
            raw: body,
            metadata: None,
        })
    }
}

#[async_trait]
impl Provider for AnthropicAdapter {
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
        let (system, messages) = Self::split_system(messages);

        let max_tokens = self
            .base
            .model_metadata
            .as_ref()
            .map(|m| m.max_output_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let mut body = json!({
            "model": self.base.model_name,
            "max_tokens": max_tokens,
            "messages": messages.iter().map(Self::message_to_wire).collect::<Vec<_>>(),
        });

        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = Value::Array(tools.iter().map(Self::tool_to_wire).collect());
        }
        if let Some(Value::Object(extra_fields)) = extras {
            let obj = body.as_object_mut().expect("body is always an object");
            for (key, value) in extra_fields {
                obj.insert(key, value);
            }
        }

        let response = self
            .base
            .client()
            .post(self.base.endpoint("/v1/messages"))
            .header("x-api-key", &self.base.secret)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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

/// A tool-call argument object on the wire is already parsed JSON for
/// Anthropic (unlike the OpenAI family, which stringifies it) — this helper
/// exists only so a future caller constructing a `ToolCall` by hand from a
/// raw string has one place that enforces the one-shot-parse invariant.
pub fn parse_tool_arguments(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(ArcLlmError::Parse(ParseError {
            raw: raw.to_string(),
            source_message: "tool-call arguments must parse as a JSON object".to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map as JsonMap;

    #[test]
    fn system_messages_are_extracted_and_joined() {
        let messages = vec![
            Message::system("be terse"),
            Message::system("avoid jargon"),
            Message::user("hi"),
        ];
        let (system, rest) = AnthropicAdapter::split_system(messages);
        assert_eq!(system, Some("be terse\navoid jargon".to_string()));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn no_system_messages_yields_none() {
        let (system, rest) = AnthropicAdapter::split_system(vec![Message::user("hi")]);
        assert_eq!(system, None);
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn stop_reason_maps_tool_use() {
        assert_eq!(
            AnthropicAdapter::stop_reason_from_wire("tool_use"),
            StopReason::ToolUse
        );
        assert_eq!(
            AnthropicAdapter::stop_reason_from_wire("anything_unrecognized"),
            StopReason::EndTurn
        );
    }

    #[test]
    fn tool_arguments_must_be_an_object() {
        assert!(parse_tool_arguments(r#"{"q": "cats"}"#).is_ok());
        assert!(parse_tool_arguments("[1, 2]").is_err());
        assert!(parse_tool_arguments("not json").is_err());
    }

    #[test]
    fn tool_use_block_translates_to_wire_with_input_key() {
        let mut args = JsonMap::new();
        args.insert("q".to_string(), Value::String("cats".to_string()));
        let block = ContentBlock::ToolUse {
            id: "t1".into(),
            name: "search".into(),
            arguments: args,
        };
        let wire = AnthropicAdapter::content_block_to_wire(&block);
        assert_eq!(wire["type"], "tool_use");
        assert_eq!(wire["input"]["q"], "cats");
    }
}
