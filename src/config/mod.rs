//! Configuration model and package-relative loading.

pub mod loader;
pub mod models;

pub use loader::{
    clear_config_cache, load_global_config, load_provider_config, validate_base_url,
    validate_provider_name,
};
pub use models::{
    Defaults, GlobalConfig, ModelMetadata, ModuleConfig, ProviderConfig, ProviderSettings,
    VaultSettings,
};
