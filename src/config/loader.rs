//! Package-relative config discovery, provider-name validation, and the
//! process-lifetime config cache.

use std::path::PathBuf;
use std::sync::OnceLock;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{ArcLlmError, ConfigError};

use super::models::{GlobalConfig, ProviderConfig};

static PROVIDER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("static regex is valid"));

const MAX_PROVIDER_NAME_LEN: usize = 64;

/// Validates a provider name against the strict convention before any
/// filesystem lookup is attempted — this is the directory-traversal guard:
/// a name like `../../etc/passwd` never reaches a path join because it
/// fails the regex first.
pub fn validate_provider_name(name: &str) -> Result<(), ConfigError> {
    if name.len() > MAX_PROVIDER_NAME_LEN {
        return Err(ConfigError::new(format!(
            "provider name '{name}' exceeds the {MAX_PROVIDER_NAME_LEN}-character limit"
        )));
    }
    if !PROVIDER_NAME_RE.is_match(name) {
        return Err(ConfigError::new(format!(
            "provider name '{name}' must match ^[a-z][a-z0-9_]*$"
        )));
    }
    Ok(())
}

/// Validates that a provider's `base_url` is HTTPS, unless it points at a
/// loopback address (the explicit local-inference exemption).
pub fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::new(format!("invalid base_url '{base_url}': {e}")))?;

    if url.scheme() == "https" {
        return Ok(());
    }

    let is_loopback = url
        .host_str()
        .map(|host| {
            host == "localhost"
                || host
                    .parse::<std::net::IpAddr>()
                    .map(|ip| ip.is_loopback())
                    .unwrap_or(false)
        })
        .unwrap_or(false);

    if is_loopback {
        return Ok(());
    }

    Err(ConfigError::new(format!(
        "base_url '{base_url}' must use https:// unless it points at a loopback address"
    )))
}

fn config_root() -> PathBuf {
    if let Ok(dir) = std::env::var("ARCLLM_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

static GLOBAL_CONFIG_CACHE: Lazy<DashMap<(), GlobalConfig>> = Lazy::new(DashMap::new);
static PROVIDER_CONFIG_CACHE: Lazy<DashMap<String, ProviderConfig>> = Lazy::new(DashMap::new);

/// Loads (and caches for the process lifetime) the global configuration
/// file at `<config root>/global.toml`.
pub fn load_global_config() -> Result<GlobalConfig, ArcLlmError> {
    if let Some(cached) = GLOBAL_CONFIG_CACHE.get(&()) {
        return Ok(cached.clone());
    }

    let path = config_root().join("global.toml");
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        ConfigError::new(format!("failed to read global config at {path:?}: {e}"))
    })?;
    let config: GlobalConfig = toml::from_str(&contents)
        .map_err(|e| ConfigError::new(format!("failed to parse global config: {e}")))?;

    GLOBAL_CONFIG_CACHE.insert((), config.clone());
    Ok(config)
}

/// Loads (and caches for the process lifetime) a single provider's config
/// file at `<config root>/providers/<name>.toml`. The name is validated
/// before any path is built.
pub fn load_provider_config(name: &str) -> Result<ProviderConfig, ArcLlmError> {
    validate_provider_name(name)?;

    if let Some(cached) = PROVIDER_CONFIG_CACHE.get(name) {
        return Ok(cached.clone());
    }

    let path = config_root().join("providers").join(format!("{name}.toml"));
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        ConfigError::new(format!(
            "failed to read provider config for '{name}' at {path:?}: {e}"
        ))
    })?;
    let config: ProviderConfig = toml::from_str(&contents)
        .map_err(|e| ConfigError::new(format!("failed to parse provider config '{name}': {e}")))?;

    validate_base_url(&config.provider.base_url)?;

    PROVIDER_CONFIG_CACHE.insert(name.to_string(), config.clone());
    Ok(config)
}

/// Testing hook: drops both config caches. Paired with
/// `crate::core::rate_limiter::clear_bucket_registry` by
/// `crate::core::registry::clear_cache`, which callers should prefer.
pub fn clear_config_cache() {
    GLOBAL_CONFIG_CACHE.clear();
    PROVIDER_CONFIG_CACHE.clear();
}

/// Guards re-entrant test setup that mutates `ARCLLM_CONFIG_DIR`; tests that
/// need an isolated config root should serialize via this lock to avoid
/// cross-test interference (env vars are process-global).
pub fn config_dir_test_lock() -> &'static std::sync::Mutex<()> {
    static LOCK: OnceLock<std::sync::Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_rejects_traversal_and_uppercase() {
        assert!(validate_provider_name("openai").is_ok());
        assert!(validate_provider_name("my_provider_1").is_ok());
        assert!(validate_provider_name("../../etc/passwd").is_err());
        assert!(validate_provider_name("OpenAI").is_err());
        assert!(validate_provider_name("1openai").is_err());
        assert!(validate_provider_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn base_url_requires_https_unless_loopback() {
        assert!(validate_base_url("https://api.openai.com").is_ok());
        assert!(validate_base_url("http://127.0.0.1:11434").is_ok());
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://api.openai.com").is_err());
        assert!(validate_base_url("http://evil.example.com").is_err());
    }

    #[test]
    fn loading_unknown_provider_fails_with_config_error() {
        let _guard = config_dir_test_lock().lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("ARCLLM_CONFIG_DIR", dir.path());
        }
        let result = load_provider_config("does_not_exist");
        unsafe {
            std::env::remove_var("ARCLLM_CONFIG_DIR");
        }
        assert!(matches!(result, Err(ArcLlmError::Config(_))));
    }
}
