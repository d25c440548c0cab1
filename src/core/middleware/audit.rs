//! Audit logging. Metadata only by default — raw message/response content
//! is logged only when a caller opts in twice: the config flag AND the
//! subscriber is actually recording at DEBUG.

use async_trait::async_trait;
use serde_json::Value;
use tracing::Level;

use crate::core::traits::Provider;
use crate::error::Result;
use crate::types::{LLMResponse, Message, Tool};

#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub include_messages: bool,
    pub include_response: bool,
}

#[derive(Debug)]
pub struct AuditMiddleware {
    inner: Box<dyn Provider>,
    config: AuditConfig,
}

impl AuditMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: AuditConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Provider for AuditMiddleware {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn invoke(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        extras: Option<Value>,
    ) -> Result<LLMResponse> {
        let message_count = messages.len();
        let tools_provided = tools.is_some();

        if self.config.include_messages && tracing::enabled!(Level::DEBUG) {
            tracing::debug!(provider = self.inner.name(), messages = ?messages, "raw request messages");
        }

        let response = self.inner.invoke(messages, tools, extras).await?;

        let provider = self.inner.name();
        let model = response.model.as_str();
        let content_length = response.content_length();
        let stop_reason = format!("{:?}", response.stop_reason);
        let tool_call_count = response.tool_calls.len();
        let has_tool_calls = tool_call_count > 0;

        // `tools_provided` and `tool_calls` are only meaningful when true /
        // non-empty, so they're only attached to the event in that case
        // rather than always logging a `false` / `0`.
        match (tools_provided, has_tool_calls) {
            (true, true) => tracing::info!(
                provider, model, message_count, content_length, stop_reason,
                tools_provided, tool_calls = tool_call_count, "call completed"
            ),
            (true, false) => tracing::info!(
                provider, model, message_count, content_length, stop_reason,
                tools_provided, "call completed"
            ),
            (false, true) => tracing::info!(
                provider, model, message_count, content_length, stop_reason,
                tool_calls = tool_call_count, "call completed"
            ),
            (false, false) => tracing::info!(
                provider, model, message_count, content_length, stop_reason, "call completed"
            ),
        }

        if self.config.include_response && tracing::enabled!(Level::DEBUG) {
            tracing::debug!(provider = self.inner.name(), response = ?response, "raw response");
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StopReason, ToolCall, Usage};
    use serde_json::Map;

    #[test]
    fn default_config_opts_out_of_raw_content() {
        let config = AuditConfig::default();
        assert!(!config.include_messages);
        assert!(!config.include_response);
    }

    #[derive(Debug)]
    struct ToolOnlyResponder;

    #[async_trait]
    impl Provider for ToolOnlyResponder {
        fn name(&self) -> &str {
            "stub"
        }
        fn model_name(&self) -> &str {
            "m"
        }
        async fn invoke(
            &self,
            _messages: Vec<Message>,
            _tools: Option<Vec<Tool>>,
            _extras: Option<Value>,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".into(),
                    name: "search".into(),
                    arguments: Map::new(),
                }],
                usage: Usage {
                    input_tokens: 1,
                    output_tokens: 1,
                    total_tokens: 2,
                    cache_read_tokens: None,
                    cache_write_tokens: None,
                    reasoning_tokens: None,
                },
                model: "m".into(),
                stop_reason: StopReason::ToolUse,
                thinking: None,
                raw: Value::Null,
                metadata: None,
            })
        }
    }

    #[tokio::test]
    async fn null_content_with_tool_calls_has_zero_content_length() {
        let middleware = AuditMiddleware::new(Box::new(ToolOnlyResponder), AuditConfig::default());
        let response = middleware.invoke(vec![Message::user("hi")], None, None).await.unwrap();
        assert_eq!(response.content_length(), 0);
        assert_eq!(response.tool_calls.len(), 1);
    }
}
