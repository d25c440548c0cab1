//! Shared adapter plumbing: HTTP client lifecycle, endpoint composition,
//! and response-to-error classification. Every concrete adapter is built on
//! top of an `AdapterBase`; subclasses (in the Rust sense: structs holding
//! one of these) override only translation, not transport.

use reqwest::Client;
use std::time::Duration;

use crate::config::ModelMetadata;
use crate::error::{ApiError, ArcLlmError, Result};

/// Owns the HTTPS client and the resolved secret for one provider instance.
#[derive(Debug, Clone)]
pub struct AdapterBase {
    pub provider_name: String,
    pub model_name: String,
    pub base_url: String,
    pub secret: String,
    pub model_metadata: Option<ModelMetadata>,
    client: Client,
}

impl AdapterBase {
    pub fn new(
        provider_name: impl Into<String>,
        model_name: impl Into<String>,
        base_url: impl Into<String>,
        secret: String,
        model_metadata: Option<ModelMetadata>,
    ) -> Result<Self> {
        let provider_name = provider_name.into();

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ArcLlmError::Connect {
                provider: provider_name.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            provider_name,
            model_name: model_name.into(),
            base_url: base_url.into(),
            secret,
            model_metadata,
            client,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Releases the client explicitly. `reqwest::Client` tears its pool
    /// down when the last clone drops, so this exists purely so callers who
    /// want deterministic, scoped release have somewhere to call — the
    /// async-context-management contract spec.md asks for, expressed
    /// without async destructors.
    pub async fn close(self) {
        drop(self.client);
    }

    /// Scoped acquisition: runs `f` against a borrow of `self`, then
    /// guarantees the client is released before returning. Rust has no
    /// `async with`, so this closure-taking form is the idiomatic
    /// equivalent — the counterpart to `close()` for callers who'd rather
    /// not manage the lifetime themselves.
    pub async fn scoped<F, Fut, T>(self, f: F) -> T
    where
        F: FnOnce(&Self) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let result = f(&self).await;
        self.close().await;
        result
    }

    /// Classifies a non-2xx HTTP response into `ApiError`, parsing
    /// `Retry-After` as a float (never raising on a malformed header —
    /// `None` on any parse failure, numeric or HTTP-date alike).
    pub fn classify_error_response(
        &self,
        status: u16,
        body: String,
        retry_after_header: Option<&str>,
    ) -> ApiError {
        let retry_after = retry_after_header.and_then(|h| h.trim().parse::<f64>().ok());
        ApiError::new(self.provider_name.clone(), status, body).with_retry_after(retry_after)
    }

    pub fn map_transport_error(&self, err: reqwest::Error) -> ArcLlmError {
        if err.is_timeout() {
            ArcLlmError::Timeout {
                provider: self.provider_name.clone(),
                message: err.to_string(),
            }
        } else {
            ArcLlmError::Connect {
                provider: self.provider_name.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AdapterBase {
        AdapterBase::new("openai", "gpt-4o", "https://api.openai.com", "sk-test".into(), None)
            .unwrap()
    }

    #[test]
    fn endpoint_composes_base_url_and_path() {
        let base = base();
        assert_eq!(base.endpoint("/v1/chat/completions"), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn endpoint_trims_trailing_slash_on_base_url() {
        let base = AdapterBase::new(
            "openai",
            "gpt-4o",
            "https://api.openai.com/",
            "sk-test".into(),
            None,
        )
        .unwrap();
        assert_eq!(base.endpoint("/v1/chat/completions"), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn retry_after_non_numeric_yields_none_never_an_error() {
        let base = base();
        let err = base.classify_error_response(429, "rate limited".into(), Some("not-a-number"));
        assert_eq!(err.retry_after, None);
        assert_eq!(err.status_code, 429);
    }

    #[test]
    fn retry_after_http_date_is_also_none() {
        let base = base();
        let err =
            base.classify_error_response(429, "rate limited".into(), Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn retry_after_numeric_parses() {
        let base = base();
        let err = base.classify_error_response(429, "rate limited".into(), Some("2.5"));
        assert_eq!(err.retry_after, Some(2.5));
    }

    #[tokio::test]
    async fn scoped_returns_the_closures_value_and_releases_the_client() {
        let base = base();
        let provider_name = base
            .scoped(|b| {
                let name = b.provider_name.clone();
                async move { name }
            })
            .await;
        assert_eq!(provider_name, "openai");
    }
}
