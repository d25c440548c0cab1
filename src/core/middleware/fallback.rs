//! Tries an ordered chain of other providers, by name, after the wrapped
//! provider fails. Each fallback is constructed fresh, on demand, through
//! the registry — nothing in the chain is built until it's actually needed.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::registry::construct_adapter;
use crate::core::traits::Provider;
use crate::error::Result;
use crate::types::{LLMResponse, Message, Tool};

#[derive(Debug, Clone, Default)]
pub struct FallbackConfig {
    /// Provider names tried in order after the primary fails. A fallback
    /// that fails to construct is skipped in favor of the next entry.
    pub chain: Vec<String>,
}

#[derive(Debug)]
pub struct FallbackMiddleware {
    inner: Box<dyn Provider>,
    config: FallbackConfig,
}

impl FallbackMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: FallbackConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Provider for FallbackMiddleware {
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
        let primary_result = self
            .inner
            .invoke(messages.clone(), tools.clone(), extras.clone())
            .await;

        if self.config.chain.is_empty() {
            return primary_result;
        }

        let primary_err = match primary_result {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        for fallback_name in &self.config.chain {
            let adapter = match construct_adapter(fallback_name, None).await {
                Ok(adapter) => adapter,
                Err(err) => {
                    tracing::warn!(
                        fallback = %fallback_name,
                        error = %err,
                        "fallback provider failed to construct, trying next"
                    );
                    continue;
                }
            };

            match adapter.invoke(messages.clone(), tools.clone(), extras.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::warn!(fallback = %fallback_name, error = %err, "fallback invocation failed");
                }
            }
        }

        // Every fallback was exhausted or failed to construct; the
        // caller sees the primary's error, not the last fallback's.
        Err(primary_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ArcLlmError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct AlwaysFails {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Provider for AlwaysFails {
        fn name(&self) -> &str {
            "primary"
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ArcLlmError::Api(ApiError::new("primary", 500, "boom")))
        }
    }

    #[tokio::test]
    async fn empty_chain_passes_through_the_primary_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let middleware = FallbackMiddleware::new(
            Box::new(AlwaysFails { calls: calls.clone() }),
            FallbackConfig::default(),
        );
        let result = middleware.invoke(vec![Message::user("hi")], None, None).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconstructable_fallback_preserves_the_primary_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let middleware = FallbackMiddleware::new(
            Box::new(AlwaysFails { calls: calls.clone() }),
            FallbackConfig {
                chain: vec!["does_not_exist_as_a_configured_provider".to_string()],
            },
        );
        let result = middleware.invoke(vec![Message::user("hi")], None, None).await;
        match result {
            Err(ArcLlmError::Api(e)) => assert_eq!(e.provider, "primary"),
            other => panic!("expected the primary's ApiError, got {other:?}"),
        }
    }
}
