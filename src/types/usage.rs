//! Token accounting.

use serde::{Deserialize, Serialize};

/// Token usage for one call. `input_tokens`, `output_tokens`, and
/// `total_tokens` are always present; the cache/reasoning fields are valid
/// only when the provider reports them — their absence carries no meaning
/// beyond "not reported" and must not be treated as zero by callers that
/// care about the distinction (telemetry's cost formula does treat absence
/// as a zero contribution, which is a deliberate, spec-mandated exception).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cache_read_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cache_write_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reasoning_tokens: Option<u64>,
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
            cache_read_tokens: add_optional(self.cache_read_tokens, rhs.cache_read_tokens),
            cache_write_tokens: add_optional(self.cache_write_tokens, rhs.cache_write_tokens),
            reasoning_tokens: add_optional(self.reasoning_tokens, rhs.reasoning_tokens),
        }
    }
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_cache_fields_are_omitted_from_serialization() {
        let usage = Usage {
            input_tokens: 1,
            output_tokens: 2,
            total_tokens: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(usage).unwrap();
        assert!(json.get("cache_read_tokens").is_none());
    }

    #[test]
    fn add_sums_present_fields_and_preserves_absence() {
        let a = Usage {
            input_tokens: 1,
            output_tokens: 1,
            total_tokens: 2,
            ..Default::default()
        };
        let b = Usage {
            input_tokens: 2,
            output_tokens: 2,
            total_tokens: 4,
            cache_read_tokens: Some(5),
            ..Default::default()
        };
        let sum = a + b;
        assert_eq!(sum.input_tokens, 3);
        assert_eq!(sum.cache_read_tokens, Some(5));
    }
}
