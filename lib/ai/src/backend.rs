//! LLM backend abstraction.
//!
//! A backend performs one chat-completion round-trip. Its outcome is
//! either plain assistant text or exactly one tool invocation, never
//! both; the provider adapter enforces that shape.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System message.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
    /// Tool result message.
    Tool,
}

/// A concrete request to run one tool, produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Invocation identifier. Kept verbatim from the provider when it
    /// supplies one, generated otherwise.
    pub id: String,
    /// Requested tool name.
    pub name: String,
    /// Argument mapping.
    pub arguments: JsonValue,
}

/// A message in a gateway conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
    /// For tool-role messages: the invocation this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For assistant messages that requested a tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolInvocation>,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_call: None,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_call: None,
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_call: None,
        }
    }

    /// Creates an assistant message carrying a tool invocation.
    #[must_use]
    pub fn assistant_tool_call(invocation: ToolInvocation) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: String::new(),
            tool_call_id: None,
            tool_call: Some(invocation),
        }
    }

    /// Creates a tool result message linked to its invocation.
    #[must_use]
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_call: None,
        }
    }
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON schema for the arguments.
    pub parameters: JsonValue,
}

/// A request to an LLM backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Full message history, leading system message first.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may invoke. Empty disables tool choice entirely.
    pub tools: Vec<ToolSpec>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with just a message history.
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Offers tools to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// The outcome of one backend call: text or exactly one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Plain assistant text.
    Text(String),
    /// The model requested a tool.
    ToolCall(ToolInvocation),
}

/// Trait for LLM backends.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Performs one chat-completion call.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable or its response
    /// cannot be interpreted.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, LlmError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_builder() {
        let request = ChatRequest::new(vec![ChatMessage::user("Hi")])
            .with_temperature(0.7)
            .with_max_tokens(300);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(300));
        assert!(request.tools.is_empty());
    }

    #[test]
    fn tool_message_carries_call_id() {
        let msg = ChatMessage::tool("call_1", "{\"success\":true}");
        assert_eq!(msg.role, ChatRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn assistant_tool_call_message() {
        let invocation = ToolInvocation {
            id: "call_1".to_string(),
            name: "check_product_stock".to_string(),
            arguments: json!({"product_name": "Widget"}),
        };
        let msg = ChatMessage::assistant_tool_call(invocation.clone());
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.tool_call, Some(invocation));
        assert!(msg.content.is_empty());
    }
}
