//! Mock backend for tests.
//!
//! A queue-based fake: tests script the outcomes, each `chat` call pops
//! the front of the queue and records the request for later assertion.
//! An exhausted queue yields empty text rather than panicking, so
//! over-long conversations fail assertions instead of aborting.

use crate::backend::{ChatOutcome, ChatRequest, LlmBackend, ToolInvocation};
use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted LLM backend.
#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Result<ChatOutcome, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    /// Creates a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a text outcome.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(ChatOutcome::Text(text.into())));
        self
    }

    /// Queues a tool-call outcome.
    #[must_use]
    pub fn with_tool_call(self, invocation: ToolInvocation) -> Self {
        self.push(Ok(ChatOutcome::ToolCall(invocation)));
        self
    }

    /// Queues an error outcome.
    #[must_use]
    pub fn with_error(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Every request the backend has seen, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }

    fn push(&self, outcome: Result<ChatOutcome, LlmError>) {
        self.script
            .lock()
            .expect("mock lock poisoned")
            .push_back(outcome);
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, LlmError> {
        self.requests
            .lock()
            .expect("mock lock poisoned")
            .push(request.clone());
        self.script
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(ChatOutcome::Text(String::new())))
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatMessage;
    use serde_json::json;

    #[tokio::test]
    async fn outcomes_pop_in_script_order() {
        let backend = MockBackend::new()
            .with_text("first")
            .with_tool_call(ToolInvocation {
                id: "call_1".to_string(),
                name: "list_all_products".to_string(),
                arguments: json!({}),
            });

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(
            backend.chat(&request).await.expect("outcome"),
            ChatOutcome::Text("first".to_string())
        );
        assert!(matches!(
            backend.chat(&request).await.expect("outcome"),
            ChatOutcome::ToolCall(_)
        ));
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_yields_empty_text() {
        let backend = MockBackend::new();
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(
            backend.chat(&request).await.expect("outcome"),
            ChatOutcome::Text(String::new())
        );
    }

    #[tokio::test]
    async fn errors_are_scripted_too() {
        let backend = MockBackend::new().with_error(LlmError::Timeout);
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(
            backend.chat(&request).await.unwrap_err(),
            LlmError::Timeout
        );
    }
}
