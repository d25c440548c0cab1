//! Structured per-call telemetry: latency, token usage, and cost. Logs only
//! on success — a failed call is the retry/audit layers' concern, not
//! telemetry's.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;

use crate::config::ModelMetadata;
use crate::core::cost::compute_cost;
use crate::core::traits::Provider;
use crate::error::{ConfigError, Result};
use crate::types::{LLMResponse, Message, Tool};

/// The closed set of accepted levels. Named after the originating system's
/// Python-logging-style vocabulary rather than `tracing::Level`'s own
/// (`TRACE`/`WARN`) — `CRITICAL` has no tracing equivalent and is dispatched
/// to `error!`, the highest level tracing has.
const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub model_metadata: Option<ModelMetadata>,
}

impl TelemetryConfig {
    pub fn validate(self) -> std::result::Result<Self, ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            return Err(ConfigError::new(format!(
                "telemetry.log_level '{}' is not one of {VALID_LOG_LEVELS:?}",
                self.log_level
            )));
        }
        Ok(self)
    }

    /// Registry-populated pricing only fills in a gap — a module config
    /// that already names its own `model_metadata` wins.
    pub fn with_pricing_if_absent(mut self, metadata: Option<ModelMetadata>) -> Self {
        if self.model_metadata.is_none() {
            self.model_metadata = metadata;
        }
        self
    }
}

/// Strips ASCII control characters (including CR/LF) so a value that ends
/// up inside a log line can't forge additional log entries.
fn sanitize(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

#[derive(Debug)]
pub struct TelemetryMiddleware {
    inner: Box<dyn Provider>,
    config: TelemetryConfig,
}

impl TelemetryMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: TelemetryConfig) -> Result<Self> {
        Ok(Self {
            inner,
            config: config.validate()?,
        })
    }
}

#[async_trait]
impl Provider for TelemetryMiddleware {
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
        let started = Instant::now();
        let response = self.inner.invoke(messages, tools, extras).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let cost = self
            .config
            .model_metadata
            .as_ref()
            .map(|metadata| compute_cost(&response.usage, metadata));

        let provider = sanitize(self.inner.name());
        let model = sanitize(&response.model);

        match self.config.log_level.to_uppercase().as_str() {
            "DEBUG" => tracing::debug!(provider, model, elapsed_ms, input_tokens = response.usage.input_tokens, output_tokens = response.usage.output_tokens, cache_read_tokens = response.usage.cache_read_tokens, cache_write_tokens = response.usage.cache_write_tokens, cost, "llm call"),
            "WARNING" => tracing::warn!(provider, model, elapsed_ms, input_tokens = response.usage.input_tokens, output_tokens = response.usage.output_tokens, cache_read_tokens = response.usage.cache_read_tokens, cache_write_tokens = response.usage.cache_write_tokens, cost, "llm call"),
            "ERROR" | "CRITICAL" => tracing::error!(provider, model, elapsed_ms, input_tokens = response.usage.input_tokens, output_tokens = response.usage.output_tokens, cache_read_tokens = response.usage.cache_read_tokens, cache_write_tokens = response.usage.cache_write_tokens, cost, "llm call"),
            _ => tracing::info!(provider, model, elapsed_ms, input_tokens = response.usage.input_tokens, output_tokens = response.usage.output_tokens, cache_read_tokens = response.usage.cache_read_tokens, cache_write_tokens = response.usage.cache_write_tokens, cost, "llm call"),
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_log_level_is_rejected() {
        let config = TelemetryConfig {
            log_level: "verbose".to_string(),
            model_metadata: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn every_standard_level_validates() {
        for level in VALID_LOG_LEVELS {
            let config = TelemetryConfig {
                log_level: level.to_string(),
                model_metadata: None,
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn registry_pricing_only_fills_an_absent_gap() {
        let metadata = ModelMetadata {
            context_window: 1,
            max_output_tokens: 1,
            supports_tools: false,
            supports_vision: false,
            supports_thinking: false,
            input_modalities: vec![],
            cost_input_per_1m: 1.0,
            cost_output_per_1m: 1.0,
            cost_cache_read_per_1m: 0.0,
            cost_cache_write_per_1m: 0.0,
        };
        let config = TelemetryConfig {
            log_level: "info".to_string(),
            model_metadata: None,
        }
        .with_pricing_if_absent(Some(metadata));
        assert!(config.model_metadata.is_some());
    }

    #[test]
    fn sanitize_strips_control_characters() {
        assert_eq!(sanitize("hello\nworld\r\t"), "helloworld");
    }
}
