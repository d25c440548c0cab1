//! The normalized data model every adapter and middleware consumes.
//!
//! Everything here is validated at construction via `serde`'s
//! `deny_unknown_fields` plus the invariants documented on each type; there
//! is no separate validation pass layered on top.

pub mod content;
pub mod message;
pub mod response;
pub mod tool;
pub mod usage;

pub use content::{ContentBlock, ToolResultContent};
pub use message::{Message, MessageContent, Role};
pub use response::{LLMResponse, StopReason};
pub use tool::{Tool, ToolCall};
pub use usage::Usage;
