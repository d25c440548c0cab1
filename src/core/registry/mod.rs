//! The convention-based registry: `load_model("openai", Some("gpt-4o"), ..)`
//! resolves a provider's config, builds its adapter, and wraps it in the
//! fixed middleware chain (innermost-first): rate-limit → fallback → retry
//! → audit → security → telemetry → otel.

use serde_json::Value;

use crate::config::{self, GlobalConfig, ModelMetadata, ProviderConfig};
use crate::core::middleware::audit::{AuditConfig, AuditMiddleware};
use crate::core::middleware::fallback::{FallbackConfig, FallbackMiddleware};
use crate::core::middleware::otel::{OtelConfig, OtelMiddleware};
use crate::core::middleware::rate_limit::{self, RateLimitConfig, RateLimitMiddleware};
use crate::core::middleware::retry::{RetryConfig, RetryMiddleware};
use crate::core::middleware::security::{SecurityConfig, SecurityMiddleware};
use crate::core::middleware::telemetry::{TelemetryConfig, TelemetryMiddleware};
use crate::core::providers::{AdapterBase, AnthropicAdapter};
use crate::core::traits::Provider;
use crate::error::{ArcLlmError, ConfigError, Result};
use crate::vault::SecretResolver;

/// Builds the bare adapter for one provider/model pair, with no middleware
/// — what the fallback chain reaches for, and the first step of
/// [`load_model`].
pub async fn construct_adapter(
    provider_name: &str,
    model_name: Option<&str>,
) -> Result<Box<dyn Provider>> {
    config::validate_provider_name(provider_name)?;
    let provider_config = config::load_provider_config(provider_name)?;

    let model_name = model_name
        .map(str::to_string)
        .unwrap_or_else(|| provider_config.provider.default_model.clone());

    let model_metadata: Option<ModelMetadata> =
        provider_config.models.get(&model_name).cloned();

    let secret = resolve_secret(provider_name, &provider_config).await?;

    let base = AdapterBase::new(
        provider_name,
        model_name,
        provider_config.provider.base_url.clone(),
        secret,
        model_metadata,
    )?;

    build_adapter(provider_name, &provider_config.provider.api_format, base)
}

fn build_adapter(
    provider_name: &str,
    api_format: &str,
    base: AdapterBase,
) -> Result<Box<dyn Provider>> {
    match api_format {
        "anthropic" => Ok(Box::new(AnthropicAdapter::new(base))),
        "openai" => crate::core::providers::build_openai_variant(provider_name, base)
            .map(|a| Box::new(a) as Box<dyn Provider>)
            .ok_or_else(|| {
                ArcLlmError::Config(ConfigError::new(format!(
                    "provider '{provider_name}' has api_format '{api_format}' but no adapter recognizes it"
                )))
            }),
        other => Err(ArcLlmError::Config(ConfigError::new(format!(
            "unrecognized api_format '{other}' for provider '{provider_name}'"
        )))),
    }
}

async fn resolve_secret(provider_name: &str, provider_config: &ProviderConfig) -> Result<String> {
    let global = config::load_global_config()?;
    let resolver = secret_resolver_for(&global);

    resolver
        .resolve(
            provider_name,
            provider_config.provider.vault_path.as_deref(),
            &provider_config.provider.api_key_env,
            provider_config.provider.api_key_required,
        )
        .await
        .map_err(ArcLlmError::Config)
}

fn secret_resolver_for(global: &GlobalConfig) -> SecretResolver {
    // Real vault backends are external collaborators this crate doesn't
    // implement; an empty or unrecognized `backend` string means "env vars
    // only", which is always a safe default.
    let _ = &global.vault.backend;
    SecretResolver::new(None, global.vault.cache_ttl_seconds)
}

fn module_config<'a>(global: &'a GlobalConfig, name: &str) -> Option<&'a config::ModuleConfig> {
    global.module(name)
}

/// One middleware kwarg's resolved state: `true` forces the module on with
/// defaults, `false` forces it off regardless of the global config, a
/// mapping forces it on with merged per-call settings, and an absent/null
/// entry defers entirely to the global config's `enabled` flag.
#[derive(Debug, Clone, Copy)]
enum Toggle<'a> {
    Defer,
    ForceOff,
    ForceOn(Option<&'a serde_json::Map<String, Value>>),
}

fn toggle_for<'a>(kwargs: Option<&'a Value>, name: &str) -> Toggle<'a> {
    let entry = match kwargs.and_then(Value::as_object).and_then(|o| o.get(name)) {
        Some(v) => v,
        None => return Toggle::Defer,
    };
    match entry {
        Value::Null => Toggle::Defer,
        Value::Bool(true) => Toggle::ForceOn(None),
        Value::Bool(false) => Toggle::ForceOff,
        Value::Object(map) => Toggle::ForceOn(Some(map)),
        _ => Toggle::Defer,
    }
}

fn module_enabled(toggle: Toggle, global: &GlobalConfig, name: &str) -> bool {
    match toggle {
        Toggle::ForceOff => false,
        Toggle::ForceOn(_) => true,
        Toggle::Defer => extra_bool(module_config(global, name), None, "enabled", false),
    }
}

fn override_map<'a>(toggle: Toggle<'a>) -> Option<&'a serde_json::Map<String, Value>> {
    match toggle {
        Toggle::ForceOn(map) => map,
        _ => None,
    }
}

fn extra_f64(
    module: Option<&config::ModuleConfig>,
    overrides: Option<&serde_json::Map<String, Value>>,
    key: &str,
    default: f64,
) -> f64 {
    overrides
        .and_then(|m| m.get(key))
        .and_then(Value::as_f64)
        .or_else(|| {
            module
                .and_then(|m| m.extra.get(key))
                .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        })
        .unwrap_or(default)
}

fn extra_u64(
    module: Option<&config::ModuleConfig>,
    overrides: Option<&serde_json::Map<String, Value>>,
    key: &str,
    default: u64,
) -> u64 {
    overrides
        .and_then(|m| m.get(key))
        .and_then(Value::as_u64)
        .or_else(|| {
            module
                .and_then(|m| m.extra.get(key))
                .and_then(|v| v.as_integer())
                .map(|i| i as u64)
        })
        .unwrap_or(default)
}

fn extra_bool(
    module: Option<&config::ModuleConfig>,
    overrides: Option<&serde_json::Map<String, Value>>,
    key: &str,
    default: bool,
) -> bool {
    overrides
        .and_then(|m| m.get(key))
        .and_then(Value::as_bool)
        .or_else(|| module.and_then(|m| m.extra.get(key)).and_then(|v| v.as_bool()))
        .unwrap_or(default)
}

fn extra_string(
    module: Option<&config::ModuleConfig>,
    overrides: Option<&serde_json::Map<String, Value>>,
    key: &str,
    default: &str,
) -> String {
    overrides
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            module
                .and_then(|m| m.extra.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| default.to_string())
}

fn extra_string_list(
    module: Option<&config::ModuleConfig>,
    overrides: Option<&serde_json::Map<String, Value>>,
    key: &str,
) -> Vec<String> {
    if let Some(arr) = overrides.and_then(|m| m.get(key)).and_then(Value::as_array) {
        return arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
    }
    module
        .and_then(|m| m.extra.get(key))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves a provider/model pair into a fully wrapped `Provider`, applying
/// every enabled middleware module in the fixed order. Middleware whose
/// `[modules.<name>]` entry is absent or `enabled = false` is skipped
/// entirely — skipping never changes the order of what remains.
pub async fn load_model(
    provider_name: &str,
    model_name: Option<&str>,
    kwargs: Option<Value>,
) -> Result<Box<dyn Provider>> {
    let global = config::load_global_config()?;
    let model_metadata = {
        let provider_config = config::load_provider_config(provider_name)?;
        let resolved_model = model_name
            .map(str::to_string)
            .unwrap_or_else(|| provider_config.provider.default_model.clone());
        provider_config.models.get(&resolved_model).cloned()
    };

    let mut provider: Box<dyn Provider> = construct_adapter(provider_name, model_name).await?;

    let rate_limit_toggle = toggle_for(kwargs.as_ref(), "rate_limit");
    if module_enabled(rate_limit_toggle, &global, "rate_limit") {
        let module = module_config(&global, "rate_limit");
        let overrides = override_map(rate_limit_toggle);
        let config = RateLimitConfig {
            requests_per_minute: extra_u64(module, overrides, "requests_per_minute", 60) as u32,
            burst_capacity: extra_u64(module, overrides, "burst_capacity", 10) as u32,
        };
        provider = Box::new(RateLimitMiddleware::new(provider, config)?);
    }

    let fallback_toggle = toggle_for(kwargs.as_ref(), "fallback");
    if module_enabled(fallback_toggle, &global, "fallback") {
        let module = module_config(&global, "fallback");
        let overrides = override_map(fallback_toggle);
        let chain = extra_string_list(module, overrides, "chain");
        provider = Box::new(FallbackMiddleware::new(provider, FallbackConfig { chain }));
    }

    let retry_toggle = toggle_for(kwargs.as_ref(), "retry");
    if module_enabled(retry_toggle, &global, "retry") {
        let module = module_config(&global, "retry");
        let overrides = override_map(retry_toggle);
        let config = RetryConfig {
            max_retries: extra_u64(module, overrides, "max_retries", 3) as u32,
            backoff_base: extra_f64(module, overrides, "backoff_base", 1.0),
            max_wait: extra_f64(module, overrides, "max_wait", 60.0),
            retryable_statuses: crate::core::middleware::retry::DEFAULT_RETRYABLE_STATUSES
                .to_vec(),
        };
        provider = Box::new(RetryMiddleware::new(provider, config)?);
    }

    let audit_toggle = toggle_for(kwargs.as_ref(), "audit");
    if module_enabled(audit_toggle, &global, "audit") {
        let module = module_config(&global, "audit");
        let overrides = override_map(audit_toggle);
        let config = AuditConfig {
            include_messages: extra_bool(module, overrides, "include_messages", false),
            include_response: extra_bool(module, overrides, "include_response", false),
        };
        provider = Box::new(AuditMiddleware::new(provider, config));
    }

    let security_toggle = toggle_for(kwargs.as_ref(), "security");
    if module_enabled(security_toggle, &global, "security") {
        let module = module_config(&global, "security");
        let overrides = override_map(security_toggle);
        let config = SecurityConfig {
            redact_pii: extra_bool(module, overrides, "redact_pii", true),
            sign_requests: extra_bool(module, overrides, "sign_requests", false),
            signing_key_env: extra_string(
                module,
                overrides,
                "signing_key_env",
                "ARCLLM_SIGNING_KEY",
            ),
        };
        provider = Box::new(SecurityMiddleware::new(provider, config)?);
    }

    let telemetry_toggle = toggle_for(kwargs.as_ref(), "telemetry");
    if module_enabled(telemetry_toggle, &global, "telemetry") {
        let module = module_config(&global, "telemetry");
        let overrides = override_map(telemetry_toggle);
        let config = TelemetryConfig {
            log_level: extra_string(module, overrides, "log_level", "info"),
            model_metadata: None,
        }
        .with_pricing_if_absent(model_metadata.clone());
        provider = Box::new(TelemetryMiddleware::new(provider, config)?);
    }

    let otel_toggle = toggle_for(kwargs.as_ref(), "otel");
    if module_enabled(otel_toggle, &global, "otel") {
        let module = module_config(&global, "otel");
        let overrides = override_map(otel_toggle);
        let config = OtelConfig {
            endpoint: extra_string(module, overrides, "endpoint", "http://localhost:4317"),
            service_name: extra_string(module, overrides, "service_name", "arcllm"),
        };
        provider = Box::new(OtelMiddleware::new(provider, config));
    }

    Ok(provider)
}

/// Drops every process-lifetime cache this crate owns: the global and
/// per-provider config caches, and every rate-limit bucket.
pub fn clear_cache() {
    config::clear_config_cache();
    rate_limit::clear_bucket_registry();
}
