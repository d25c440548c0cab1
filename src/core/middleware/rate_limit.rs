//! Token-bucket rate limiting, one bucket per provider name, shared across
//! every middleware instance constructed for that provider within the
//! process — the first construction wins and seeds the bucket; later
//! constructions for the same name reuse it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::core::traits::Provider;
use crate::error::{ConfigError, Result};
use crate::types::{LLMResponse, Message, Tool};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_capacity: u32,
}

impl RateLimitConfig {
    pub fn validate(self) -> std::result::Result<Self, ConfigError> {
        if self.requests_per_minute == 0 {
            return Err(ConfigError::new(
                "rate_limit.requests_per_minute must be greater than zero",
            ));
        }
        if self.burst_capacity < 1 {
            return Err(ConfigError::new(
                "rate_limit.burst_capacity must be at least 1",
            ));
        }
        Ok(self)
    }
}

#[derive(Debug)]
struct Bucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_second: f64,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

static BUCKETS: Lazy<DashMap<String, Arc<Bucket>>> = Lazy::new(DashMap::new);

fn bucket_for(provider_name: &str, config: RateLimitConfig) -> Arc<Bucket> {
    BUCKETS
        .entry(provider_name.to_string())
        .or_insert_with(|| {
            Arc::new(Bucket {
                state: Mutex::new(BucketState {
                    tokens: config.burst_capacity as f64,
                    last_refill: Instant::now(),
                }),
                capacity: config.burst_capacity as f64,
                refill_per_second: config.requests_per_minute as f64 / 60.0,
            })
        })
        .clone()
}

/// Drops every provider's bucket. Exposed for `registry::clear_cache`.
pub fn clear_bucket_registry() {
    BUCKETS.clear();
}

impl Bucket {
    /// Waits, if necessary, until a token is available, then consumes one.
    /// The sleep happens outside the lock so other callers aren't blocked
    /// behind a single waiter.
    async fn acquire(&self) -> Duration {
        let wait = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(state.last_refill).as_secs_f64();
            state.tokens = (state.tokens + elapsed * self.refill_per_second).min(self.capacity);
            state.last_refill = now;

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                Duration::ZERO
            } else {
                let deficit = 1.0 - state.tokens;
                let wait_secs = deficit / self.refill_per_second;
                state.tokens = 0.0;
                Duration::from_secs_f64(wait_secs)
            }
        };

        if wait > Duration::ZERO {
            tokio::time::sleep(wait).await;
        }
        wait
    }
}

#[derive(Debug)]
pub struct RateLimitMiddleware {
    inner: Box<dyn Provider>,
    bucket: Arc<Bucket>,
}

impl RateLimitMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: RateLimitConfig) -> Result<Self> {
        let config = config.validate()?;
        let bucket = bucket_for(inner.name(), config);
        Ok(Self { inner, bucket })
    }
}

#[async_trait]
impl Provider for RateLimitMiddleware {
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
        let wait = self.bucket.acquire().await;
        if wait > Duration::ZERO {
            tracing::warn!(
                provider = self.inner.name(),
                wait_ms = wait.as_millis() as u64,
                "rate limit delayed invocation"
            );
        }
        self.inner.invoke(messages, tools, extras).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_requests_per_minute() {
        let config = RateLimitConfig {
            requests_per_minute: 0,
            burst_capacity: 1,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_burst_capacity() {
        let config = RateLimitConfig {
            requests_per_minute: 60,
            burst_capacity: 0,
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn bucket_allows_burst_then_waits() {
        let bucket = Bucket {
            state: Mutex::new(BucketState {
                tokens: 1.0,
                last_refill: Instant::now(),
            }),
            capacity: 1.0,
            refill_per_second: 1.0,
        };
        let first_wait = bucket.acquire().await;
        assert_eq!(first_wait, Duration::ZERO);
        let second_wait = bucket.acquire().await;
        assert!(second_wait > Duration::ZERO);
    }
}
