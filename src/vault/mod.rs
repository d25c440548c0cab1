//! Secret resolution: an external backend (TTL-cached) falling back to a
//! named environment variable.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::ConfigError;

/// Contract a secret-store backend must satisfy. Concrete backends
/// (Vault, AWS Secrets Manager, a local keyring, ...) are external
/// collaborators — this crate only defines the shape they must have.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    async fn get_secret(&self, path: &str) -> Option<String>;
    fn is_available(&self) -> bool;
}

/// Resolves a provider's secret, honoring `api_key_required`.
///
/// Resolution order: (1) if a backend is configured and the provider has a
/// `vault_path`, try the backend (serving from cache when fresh); (2) on
/// miss or backend unavailability, read `api_key_env`; (3) if neither
/// yields a value and the secret is required, fail with `ConfigError`.
pub struct SecretResolver {
    backend: Option<Box<dyn VaultBackend>>,
    cache: DashMap<String, (String, Instant)>,
    ttl: Duration,
}

impl SecretResolver {
    pub fn new(backend: Option<Box<dyn VaultBackend>>, ttl_seconds: u64) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub fn without_backend() -> Self {
        Self::new(None, 300)
    }

    async fn from_backend(&self, vault_path: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;

        if let Some(entry) = self.cache.get(vault_path) {
            let (value, expiry) = entry.value().clone();
            if expiry > Instant::now() {
                return Some(value);
            }
        }

        if !backend.is_available() {
            return None;
        }

        let value = backend.get_secret(vault_path).await?;
        self.cache
            .insert(vault_path.to_string(), (value.clone(), Instant::now() + self.ttl));
        Some(value)
    }

    /// Resolves the secret for a provider. `provider_name` is used only for
    /// the error message; it carries no security meaning here.
    pub async fn resolve(
        &self,
        provider_name: &str,
        vault_path: Option<&str>,
        api_key_env: &str,
        api_key_required: bool,
    ) -> Result<String, ConfigError> {
        if let Some(vault_path) = vault_path {
            if let Some(value) = self.from_backend(vault_path).await {
                return Ok(value);
            }
        }

        if let Ok(value) = std::env::var(api_key_env) {
            if !value.is_empty() {
                return Ok(value);
            }
        }

        if api_key_required {
            Err(ConfigError::new(format!(
                "no secret available for provider '{provider_name}': \
                 vault backend missed and environment variable '{api_key_env}' is unset"
            )))
        } else {
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        value: Option<String>,
    }

    #[async_trait]
    impl VaultBackend for CountingBackend {
        async fn get_secret(&self, _path: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.value.clone()
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn falls_back_to_env_var_on_backend_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend {
            calls: calls.clone(),
            value: None,
        };
        let resolver = SecretResolver::new(Some(Box::new(backend)), 300);

        unsafe {
            std::env::set_var("ARCLLM_TEST_SECRET", "from-env");
        }
        let secret = resolver
            .resolve("openai", Some("secret/openai"), "ARCLLM_TEST_SECRET", true)
            .await
            .unwrap();
        unsafe {
            std::env::remove_var("ARCLLM_TEST_SECRET");
        }

        assert_eq!(secret, "from-env");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn required_secret_missing_everywhere_is_config_error() {
        let resolver = SecretResolver::without_backend();
        let result = resolver
            .resolve("openai", None, "ARCLLM_DEFINITELY_UNSET_VAR", true)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn optional_secret_missing_everywhere_is_empty_string() {
        let resolver = SecretResolver::without_backend();
        let result = resolver
            .resolve("ollama", None, "ARCLLM_DEFINITELY_UNSET_VAR", false)
            .await
            .unwrap();
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn backend_hit_is_cached_across_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend {
            calls: calls.clone(),
            value: Some("cached-secret".to_string()),
        };
        let resolver = SecretResolver::new(Some(Box::new(backend)), 300);

        for _ in 0..3 {
            let secret = resolver
                .resolve("openai", Some("secret/openai"), "ARCLLM_UNSET", true)
                .await
                .unwrap();
            assert_eq!(secret, "cached-secret");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
