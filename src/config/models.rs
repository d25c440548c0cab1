//! Typed configuration structures loaded from TOML.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

fn default_temperature() -> f64 {
    0.7
}

/// `[provider]` — static, per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    pub api_format: String,
    pub base_url: String,
    pub api_key_env: String,
    #[serde(default = "default_true")]
    pub api_key_required: bool,
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default)]
    pub vault_path: Option<String>,
}

/// `[models."<name>"]` — one entry per model a provider exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMetadata {
    pub context_window: u64,
    pub max_output_tokens: u64,
    #[serde(default)]
    pub supports_tools: bool,
    #[serde(default)]
    pub supports_vision: bool,
    #[serde(default)]
    pub supports_thinking: bool,
    #[serde(default)]
    pub input_modalities: Vec<String>,
    pub cost_input_per_1m: f64,
    pub cost_output_per_1m: f64,
    #[serde(default)]
    pub cost_cache_read_per_1m: f64,
    #[serde(default)]
    pub cost_cache_write_per_1m: f64,
}

/// The full parsed contents of one provider's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub models: HashMap<String, ModelMetadata>,
}

/// `[defaults]` in the global config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub provider: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u64>,
}

fn default_cache_ttl() -> u64 {
    300
}

/// `[vault]` — secret-backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct VaultSettings {
    /// "module:ClassName"-shaped backend identifier, or empty for "no
    /// external backend, env vars only".
    #[serde(default)]
    pub backend: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

/// `[modules.<name>]` — one entry per recognized middleware module.
/// `enabled` is the one field every module-specific config must carry;
/// everything else is preserved verbatim for the owning middleware to
/// validate at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModuleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, toml::Value>,
}

/// The fully parsed global configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    pub defaults: Defaults,
    #[serde(default)]
    pub vault: VaultSettings,
    #[serde(default)]
    pub modules: HashMap<String, ModuleConfig>,
}

impl GlobalConfig {
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.get(name)
    }

    pub fn module_enabled(&self, name: &str) -> bool {
        self.modules.get(name).map(|m| m.enabled).unwrap_or(false)
    }
}
