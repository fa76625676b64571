//! Conversation layer for the storefront assistant.
//!
//! This crate provides:
//!
//! - **Messages**: the per-turn conversation records
//! - **Session Registry**: per-session message logs with per-key locking
//! - **Tool Catalog**: the closed set of operations the model may invoke,
//!   with their argument schemas, and the uniform result envelope

pub mod message;
pub mod session;
pub mod tool;

pub use message::{Message, MessageRole};
pub use session::{Session, SessionHandle, SessionRegistry};
pub use tool::{ErrorKind, ToolDefinition, ToolName, ToolResult, catalog};
