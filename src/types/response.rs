//! The normalized response every adapter returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tool::ToolCall;
use super::usage::Usage;

/// Closed set of reasons a model stops generating. Unknown provider-native
/// reasons map to `EndTurn` — never left unmapped, never a catch-all string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

/// The normalized result of one provider call.
///
/// `raw` carries the provider's original parsed body for callers who need
/// an escape hatch; it is never serialized (middleware must not leak it
/// into logs by accident — audit and telemetry read only the typed fields).
#[derive(Debug, Clone, Serialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub model: String,
    pub stop_reason: StopReason,
    pub thinking: Option<String>,
    #[serde(skip)]
    pub raw: Value,
    pub metadata: Option<Map<String, Value>>,
}

impl LLMResponse {
    /// `content_length` as audit logging defines it: zero when content is
    /// absent, never an error — a tool-only turn is a valid response shape.
    pub fn content_length(&self) -> usize {
        self.content.as_deref().map(str::len).unwrap_or(0)
    }

    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        self.metadata.get_or_insert_with(Map::new)
    }
}
