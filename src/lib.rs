//! # arcllm
//!
//! A unified client library for calling multiple LLM providers through one
//! normalized data model: messages, content blocks, tools, and responses
//! that look the same whether the call landed on Anthropic's Messages API
//! or one of the ten OpenAI Chat-Completions-shaped providers this crate
//! also speaks.
//!
//! Every call is resolved through [`load_model`], which reads a provider's
//! TOML config, builds its adapter, and wraps it in whichever of the
//! rate-limit, fallback, retry, audit, security, telemetry, and OpenTelemetry
//! middleware layers are enabled — always in that fixed order.
//!
//! ```rust,no_run
//! use arcllm::{load_model, Message};
//!
//! #[tokio::main]
//! async fn main() -> arcllm::Result<()> {
//!     let model = load_model("anthropic", Some("claude-3-5-sonnet-20241022"), None).await?;
//!     let response = model
//!         .invoke(vec![Message::user("What is the capital of France?")], None, None)
//!         .await?;
//!     println!("{:?}", response.content);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod types;
pub mod vault;

pub use core::registry::{clear_cache, load_model};
pub use core::Provider;
pub use error::{ArcLlmError, Result};
pub use types::{
    ContentBlock, LLMResponse, Message, MessageContent, Role, StopReason, Tool, ToolCall,
    ToolResultContent, Usage,
};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_cargo_manifest() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, env!("CARGO_PKG_NAME"));
    }
}
