//! Tool declarations and tool-call results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool the caller offers the model. `parameters` is a raw JSON-Schema
/// object — this crate never validates or types it beyond "is a mapping".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: Map<String, Value>,
}

/// A tool invocation requested by the model.
///
/// Invariant: `arguments` is always a mapping by the time an adapter hands
/// this back to the caller. Providers that put arguments on the wire as a
/// JSON string are parsed exactly once; a parse failure is fatal
/// (`ParseError`), never silently replaced with an empty map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_round_trips() {
        let tool = Tool {
            name: "search".into(),
            description: "search the web".into(),
            parameters: serde_json::from_value(serde_json::json!({
                "type": "object",
                "properties": {"q": {"type": "string"}}
            }))
            .unwrap(),
        };
        let json = serde_json::to_value(&tool).unwrap();
        let back: Tool = serde_json::from_value(json).unwrap();
        assert_eq!(back, tool);
    }
}
