//! The cost formula shared by the telemetry middleware and anything else
//! that needs to price a response against its model's per-token rates.

use crate::config::ModelMetadata;
use crate::types::Usage;

/// `(input*c_in + output*c_out + cache_read*c_cr + cache_write*c_cw) / 1_000_000`.
/// Absent cache counts contribute zero, never `None` propagation — a model
/// that never reports cache usage still gets a priced response.
pub fn compute_cost(usage: &Usage, metadata: &ModelMetadata) -> f64 {
    let cache_read = usage.cache_read_tokens.unwrap_or(0) as f64;
    let cache_write = usage.cache_write_tokens.unwrap_or(0) as f64;

    (usage.input_tokens as f64 * metadata.cost_input_per_1m
        + usage.output_tokens as f64 * metadata.cost_output_per_1m
        + cache_read * metadata.cost_cache_read_per_1m
        + cache_write * metadata.cost_cache_write_per_1m)
        / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ModelMetadata {
        ModelMetadata {
            context_window: 128_000,
            max_output_tokens: 4096,
            supports_tools: true,
            supports_vision: false,
            supports_thinking: false,
            input_modalities: vec!["text".into()],
            cost_input_per_1m: 3.0,
            cost_output_per_1m: 15.0,
            cost_cache_read_per_1m: 0.3,
            cost_cache_write_per_1m: 3.75,
        }
    }

    #[test]
    fn absent_cache_counts_contribute_zero() {
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            total_tokens: 2_000_000,
            cache_read_tokens: None,
            cache_write_tokens: None,
            reasoning_tokens: None,
        };
        assert_eq!(compute_cost(&usage, &metadata()), 18.0);
    }

    #[test]
    fn cache_counts_are_priced_at_their_own_rate() {
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 0,
            total_tokens: 1_000_000,
            cache_read_tokens: Some(1_000_000),
            cache_write_tokens: Some(1_000_000),
            reasoning_tokens: None,
        };
        assert_eq!(compute_cost(&usage, &metadata()), 3.0 + 0.3 + 3.75);
    }
}
