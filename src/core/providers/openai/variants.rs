//! The OpenAI-format near-variants: providers whose wire format is
//! Chat-Completions-shaped closely enough that they share `OpenAiAdapter`
//! wholesale, differing only in base URL and the quirks below.
//!
//! Every variant name here corresponds 1:1 to a provider config file
//! (`config/providers/<name>.toml`) and is looked up by the registry's
//! convention-based adapter match — see `core::registry`.

use super::{OpenAiAdapter, Quirks};
use crate::core::providers::base::AdapterBase;

/// Construct the adapter for a given OpenAI-format variant by name. Returns
/// `None` for a name this module doesn't recognize, letting the registry
/// fall through to its other adapter families.
pub fn build(name: &str, base: AdapterBase) -> Option<OpenAiAdapter> {
    let adapter = match name {
        "openai" => OpenAiAdapter::new(base),
        "groq" | "deepseek" | "xai" | "cloudflare" | "moonshot" | "meta_llama" | "deepinfra"
        | "openrouter" => OpenAiAdapter::new(base),
        "mistral" => OpenAiAdapter::new(base).with_quirks(Quirks {
            tool_choice_required_as_any: true,
            extra_length_finish_reason: Some("model_length"),
        }),
        // Not one of spec.md's nine near-variants, but the same wire format
        // and explicitly called out in its own example text: a local
        // inference server with no required secret.
        "ollama" => OpenAiAdapter::new(base),
        _ => return None,
    };
    Some(adapter)
}
