//! Exponential backoff with proportional jitter, bounded by `max_wait` and
//! overridden upward by a provider's own `Retry-After` when present.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, Instrument, Span};

use crate::core::traits::Provider;
use crate::error::{ArcLlmError, ConfigError, Result};
use crate::types::{LLMResponse, Message, Tool};

use super::record_error;

/// HTTP status codes retried by default. 401/403 are deliberately absent —
/// an auth failure will not resolve itself on a retry.
pub const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 529];

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_base: f64,
    pub max_wait: f64,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 1.0,
            max_wait: 60.0,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn validate(self) -> std::result::Result<Self, ConfigError> {
        if self.backoff_base <= 0.0 {
            return Err(ConfigError::new("retry.backoff_base must be greater than zero"));
        }
        if self.max_wait <= 0.0 {
            return Err(ConfigError::new("retry.max_wait must be greater than zero"));
        }
        Ok(self)
    }

    fn is_retryable(&self, err: &ArcLlmError) -> bool {
        match err {
            ArcLlmError::Api(api) => {
                !api.is_auth_error() && self.retryable_statuses.contains(&api.status_code)
            }
            _ => err.is_transport_retryable(),
        }
    }

    /// Backoff for attempt `n` (0-indexed): `backoff_base * 2^n`, ±25%
    /// proportional jitter, capped at `max_wait`, then raised to the
    /// provider's own `Retry-After` if that is larger.
    fn wait_for_attempt(&self, attempt: u32, retry_after: Option<f64>) -> Duration {
        let exponential = self.backoff_base * 2f64.powi(attempt as i32);
        let capped = exponential.min(self.max_wait);
        let jitter_factor = rand::thread_rng().gen_range(0.75..=1.25);
        let jittered = (capped * jitter_factor).min(self.max_wait);
        let with_retry_after = match retry_after {
            Some(ra) if ra > jittered => ra,
            _ => jittered,
        };
        Duration::from_secs_f64(with_retry_after.max(0.0))
    }
}

#[derive(Debug)]
pub struct RetryMiddleware {
    inner: Box<dyn Provider>,
    config: RetryConfig,
}

impl RetryMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: RetryConfig) -> Result<Self> {
        Ok(Self {
            inner,
            config: config.validate()?,
        })
    }
}

#[async_trait]
impl Provider for RetryMiddleware {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    #[instrument(skip_all, fields(provider = self.inner.name(), error = tracing::field::Empty))]
    async fn invoke(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        extras: Option<Value>,
    ) -> Result<LLMResponse> {
        let parent_span = Span::current();
        let mut attempt = 0;

        loop {
            let attempt_span = tracing::info_span!("retry_attempt", attempt);
            let result = self
                .inner
                .invoke(messages.clone(), tools.clone(), extras.clone())
                .instrument(attempt_span)
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt >= self.config.max_retries || !self.config.is_retryable(&err) {
                        record_error(&parent_span, &err);
                        return Err(err);
                    }
                    let wait = self.config.wait_for_attempt(attempt, err.retry_after());
                    tracing::warn!(attempt, wait_ms = wait.as_millis() as u64, error = %err, "retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
