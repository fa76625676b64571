//! Model gateway for the storefront assistant.
//!
//! This crate provides:
//!
//! - **Backend abstraction**: one chat-completion call returning either
//!   assistant text or exactly one tool invocation
//! - **OpenAI-compatible adapter**: the wire-level implementation
//! - **Model Gateway**: the explicit two-step decide/narrate protocol the
//!   assistant drives, with total degradation: a gateway call always
//!   produces text for the user, never an error
//! - **Mock backend**: a scripted test double

pub mod backend;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod openai;

pub use backend::{ChatMessage, ChatOutcome, ChatRequest, ChatRole, LlmBackend, ToolInvocation, ToolSpec};
pub use error::LlmError;
pub use gateway::{Decision, GatewayOptions, ModelGateway};
pub use mock::MockBackend;
pub use openai::{OpenAiBackend, OpenAiConfig};
