//! Content block types shared by every provider adapter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single block of message content.
///
/// Discriminated by `type`; no inheritance, just a closed sum type. Every
/// adapter translates to and from this shape — it is the contract every
/// provider must honor, not any one provider's native wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        /// Base64 payload or a URL, depending on the provider.
        source: String,
        media_type: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Always a parsed mapping by the time this type is constructed —
        /// adapters that receive a JSON string parse it once at the wire
        /// boundary and never store the raw string here.
        arguments: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: ToolResultContent,
    },
}

/// `tool_result.content` may be plain text or a nested sequence of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}
