//! Adapters translating the normalized data model to/from one provider's
//! wire format. Every adapter implements `Provider` and is otherwise
//! unreachable except through `core::registry::load_model`.

pub mod anthropic;
pub mod base;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use base::AdapterBase;
pub use openai::variants::build as build_openai_variant;
pub use openai::{OpenAiAdapter, Quirks};
