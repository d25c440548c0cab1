//! The capability set every adapter and every middleware implements.
//!
//! This is the seam the whole middleware chain composes around: a
//! middleware is just a value holding an inner value of this same trait.
//! Composition is by containment, never by inheritance.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{LLMResponse, Message, Tool};

#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Unique, lowercase provider identifier — also keys the rate-limit
    /// bucket and the config file.
    fn name(&self) -> &str;

    /// The model this instance was constructed against.
    fn model_name(&self) -> &str;

    async fn invoke(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        extras: Option<Value>,
    ) -> Result<LLMResponse>;
}
