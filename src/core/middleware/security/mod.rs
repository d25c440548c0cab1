//! Outbound PII redaction, canonical request signing, and inbound
//! redaction of the response — in that order. Signing always runs on the
//! already-redacted outbound payload, never the caller's original text.

mod pii;
mod signing;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::traits::Provider;
use crate::error::Result;
use crate::types::{ContentBlock, LLMResponse, Message, MessageContent, Tool, ToolResultContent};

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub redact_pii: bool,
    pub sign_requests: bool,
    pub signing_key_env: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            redact_pii: true,
            sign_requests: false,
            signing_key_env: "ARCLLM_SIGNING_KEY".to_string(),
        }
    }
}

fn redact_content_block(block: ContentBlock) -> ContentBlock {
    match block {
        ContentBlock::Text { text } => ContentBlock::Text { text: pii::redact(&text) },
        ContentBlock::ToolResult { tool_use_id, content } => ContentBlock::ToolResult {
            tool_use_id,
            content: match content {
                ToolResultContent::Text(text) => ToolResultContent::Text(pii::redact(&text)),
                ToolResultContent::Blocks(blocks) => ToolResultContent::Blocks(
                    blocks.into_iter().map(redact_content_block).collect(),
                ),
            },
        },
        other => other,
    }
}

fn redact_message(message: Message) -> Message {
    let content = match message.content {
        MessageContent::Text(text) => MessageContent::Text(pii::redact(&text)),
        MessageContent::Blocks(blocks) => {
            MessageContent::Blocks(blocks.into_iter().map(redact_content_block).collect())
        }
    };
    Message { role: message.role, content }
}

#[derive(Debug)]
pub struct SecurityMiddleware {
    inner: Box<dyn Provider>,
    config: SecurityConfig,
}

impl SecurityMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: SecurityConfig) -> Result<Self> {
        Ok(Self { inner, config })
    }

    fn signing_key(&self) -> Result<Vec<u8>> {
        let raw = std::env::var(&self.config.signing_key_env).map_err(|_| {
            crate::error::ConfigError::new(format!(
                "security.sign_requests is enabled but environment variable '{}' is unset",
                self.config.signing_key_env
            ))
        })?;
        Ok(raw.into_bytes())
    }
}

#[async_trait]
impl Provider for SecurityMiddleware {
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
        let outbound_messages = if self.config.redact_pii {
            messages.into_iter().map(redact_message).collect()
        } else {
            messages
        };

        let signature = if self.config.sign_requests {
            let key = self.signing_key()?;
            let payload = signing::canonicalize(&json!({
                "messages": &outbound_messages,
                "tools": &tools,
                "model": self.inner.model_name(),
            }));
            Some((signing::sign_hmac_sha256(&key, &payload)?, "hmac-sha256"))
        } else {
            None
        };

        let mut response = self
            .inner
            .invoke(outbound_messages, tools, extras)
            .await?;

        if self.config.redact_pii {
            if let Some(content) = response.content.take() {
                response.content = Some(pii::redact(&content));
            }
        }

        if let Some((signature, algorithm)) = signature {
            let metadata = response.metadata_mut();
            metadata.insert("request_signature".to_string(), Value::String(signature));
            metadata.insert("signing_algorithm".to_string(), Value::String(algorithm.to_string()));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn redact_message_strips_pii_from_plain_text() {
        let message = Message::user("call me at 555-123-4567");
        let redacted = redact_message(message);
        assert_eq!(redacted.content.as_text(), Some("call me at [PII:PHONE]"));
    }

    #[test]
    fn redact_message_preserves_role() {
        let message = Message::new(Role::Assistant, "no pii here".to_string());
        let redacted = redact_message(message);
        assert_eq!(redacted.role, Role::Assistant);
    }

    #[test]
    fn default_config_redacts_but_does_not_sign() {
        let config = SecurityConfig::default();
        assert!(config.redact_pii);
        assert!(!config.sign_requests);
    }
}
