//! The two-step model gateway protocol.
//!
//! Every user turn makes at most two model calls:
//!
//! 1. **Decide**: full history plus the tool catalog; the model answers
//!    with text or requests exactly one tool.
//! 2. **Narrate**: history plus the executed tool's result; the model
//!    phrases the closing reply.
//!
//! The split lets the caller execute the tool exactly once between the
//! calls, and makes skipping narration an explicit caller choice. Both
//! steps degrade totally: the gateway always returns text, never an
//! error, so a model outage reads as an apology rather than a fault.

use crate::backend::{ChatMessage, ChatOutcome, ChatRequest, LlmBackend, ToolInvocation, ToolSpec};
use std::sync::Arc;

/// The gateway's answer to a decide call.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Plain text for the user.
    Reply(String),
    /// The model requested a tool.
    Invoke(ToolInvocation),
}

/// Sampling options for the two gateway calls.
#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions {
    /// Temperature for both calls.
    pub temperature: f32,
    /// Maximum tokens generated by the decide call.
    pub decide_max_tokens: u32,
    /// Maximum tokens generated by the narrate call.
    pub narrate_max_tokens: u32,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            decide_max_tokens: 300,
            narrate_max_tokens: 200,
        }
    }
}

/// Gateway between the assistant and an LLM backend.
pub struct ModelGateway {
    backend: Arc<dyn LlmBackend>,
    options: GatewayOptions,
}

impl ModelGateway {
    /// Creates a gateway over a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            options: GatewayOptions::default(),
        }
    }

    /// Overrides the sampling options.
    #[must_use]
    pub fn with_options(mut self, options: GatewayOptions) -> Self {
        self.options = options;
        self
    }

    /// Asks the model to answer or pick one tool.
    ///
    /// On backend failure this returns a `Reply` describing the trouble;
    /// the error never propagates past this boundary.
    pub async fn decide(&self, history: &[ChatMessage], tools: &[ToolSpec]) -> Decision {
        let request = ChatRequest::new(history.to_vec())
            .with_tools(tools.to_vec())
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.decide_max_tokens);

        match self.backend.chat(&request).await {
            Ok(ChatOutcome::Text(text)) => Decision::Reply(text),
            Ok(ChatOutcome::ToolCall(invocation)) => Decision::Invoke(invocation),
            Err(e) => {
                tracing::warn!(error = %e, "model decide call failed, degrading to apology");
                Decision::Reply(format!(
                    "I'm having trouble processing that request. Error: {e}"
                ))
            }
        }
    }

    /// Asks the model to phrase the reply after a tool ran.
    ///
    /// `result_json` is the serialized tool result appended as a
    /// tool-role message; `fallback` is returned verbatim when the model
    /// fails or produces nothing, so the caller always gets an answer.
    pub async fn narrate(
        &self,
        history: &[ChatMessage],
        invocation: &ToolInvocation,
        result_json: &str,
        fallback: &str,
    ) -> String {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::assistant_tool_call(invocation.clone()));
        messages.push(ChatMessage::tool(invocation.id.clone(), result_json));

        let request = ChatRequest::new(messages)
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.narrate_max_tokens);

        match self.backend.chat(&request).await {
            Ok(ChatOutcome::Text(text)) if !text.trim().is_empty() => text,
            Ok(_) => fallback.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "model narrate call failed, using tool result text");
                fallback.to_string()
            }
        }
    }
}
