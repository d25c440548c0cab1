//! The closed error taxonomy every component raises into.
//!
//! Every caller-facing error names its kind and component in a non-empty
//! message; none of them ever carry a raw secret or un-redacted PII.

use thiserror::Error;

/// Schema, validation, or provisioning failures discovered before any
/// network call is made: bad config, a missing required secret, an unknown
/// module key, a missing adapter implementation, an invalid log level.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A tool-call argument string failed to parse as JSON. Carries the raw
/// string so the caller can inspect what the provider actually sent.
#[derive(Debug, Error, Clone)]
#[error("failed to parse tool-call arguments as JSON: {source_message} (raw: {raw})")]
pub struct ParseError {
    pub raw: String,
    pub source_message: String,
}

/// A non-2xx HTTP response from a provider, already classified.
#[derive(Debug, Error, Clone)]
#[error("{provider} returned HTTP {status_code}: {body}")]
pub struct ApiError {
    pub status_code: u16,
    /// Truncated to 500 chars in this `Display` form; the untruncated body
    /// is not retained anywhere.
    pub body: String,
    pub provider: String,
    pub retry_after: Option<f64>,
}

impl ApiError {
    pub fn new(provider: impl Into<String>, status_code: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let truncated = if body.len() > 500 {
            format!("{}...", &body[..500])
        } else {
            body
        };
        Self {
            status_code,
            body: truncated,
            provider: provider.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<f64>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// 401/403 — a specialization of `ApiError`, never in the default
    /// retryable set (see `RetryConfig::default`).
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status_code, 401 | 403)
    }
}

/// Top-level error type every public function in this crate returns.
#[derive(Debug, Error, Clone)]
pub enum ArcLlmError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("connection error calling {provider}: {message}")]
    Connect { provider: String, message: String },
    #[error("request to {provider} timed out: {message}")]
    Timeout { provider: String, message: String },
}

impl ArcLlmError {
    /// Whether the retry middleware should treat this as retryable at all
    /// (status-set membership for `Api` is checked separately by the retry
    /// middleware against its configured set — this only covers the kinds
    /// that are unconditionally retryable or unconditionally not).
    pub fn is_transport_retryable(&self) -> bool {
        matches!(self, ArcLlmError::Connect { .. } | ArcLlmError::Timeout { .. })
    }

    pub fn retry_after(&self) -> Option<f64> {
        match self {
            ArcLlmError::Api(e) => e.retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArcLlmError>;
