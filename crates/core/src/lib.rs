//! # opsclaw core
//!
//! Domain types, traits, and error definitions for the opsclaw oncall agent.
//! Every other crate in the workspace depends inward on this one.
//!
//! - [`provider`]: the LLM and vision backends as traits
//! - [`tool`]: side-effecting capabilities the model may call
//! - [`step`]: the per-step progress record handed to observers
//! - [`display`]: the bordered console block every formatter renders with

pub mod display;
pub mod error;
pub mod message;
pub mod provider;
pub mod step;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use display::{print_box, render_box, truncate};
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage, VisionModel};
pub use step::{StepEvent, StepToolResult};
pub use tool::{ResultFormatter, Tool, ToolCall, ToolOutcome, ToolRegistry, ToolResult};
