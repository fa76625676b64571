//! Conversational tool-dispatch engine for storefront.
//!
//! This crate wires the conversation layer, the model gateway, and the
//! domain stores into the assistant:
//!
//! - **Dispatcher**: turns a model invocation into an authorized,
//!   validated domain operation with a uniform result envelope
//! - **Handlers**: the twelve domain operations
//! - **Prompt**: role-specific system prompt with an inventory snapshot
//! - **Engine**: the per-turn control flow and response synthesis

pub mod dispatch;
pub mod engine;
mod handlers;
pub mod prompt;

pub use dispatch::Dispatcher;
pub use engine::{Assistant, AssistantOptions, ChatReply};
