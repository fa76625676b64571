//! OpenAI-compatible chat-completions backend.
//!
//! Speaks the `/chat/completions` wire format, which most hosted and
//! local providers accept. The wire types below mirror the provider's
//! JSON and are not part of the public API.

use crate::backend::{ChatMessage, ChatOutcome, ChatRequest, ChatRole, LlmBackend, ToolInvocation};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use storefront_core::InvocationId;

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token, if the provider requires one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl OpenAiConfig {
    /// Creates a configuration for the given API root and model.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Backend speaking the OpenAI chat-completions protocol.
pub struct OpenAiBackend {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the HTTP client cannot be constructed.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = wire::build_request(&self.config.model, request);

        let mut http_request = self.http.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = wire::error_message(&body)
                .unwrap_or_else(|| format!("status {status}"));
            return Err(LlmError::RequestFailed { reason });
        }

        let parsed: wire::Response =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        wire::into_outcome(parsed)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

mod wire {
    use super::*;

    // ── Request types ──────────────────────────────────────────────

    #[derive(Debug, Serialize)]
    pub(super) struct Request<'a> {
        pub model: &'a str,
        pub messages: Vec<Message>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub max_tokens: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tools: Option<Vec<Tool>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_choice: Option<&'static str>,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct Message {
        pub role: &'static str,
        pub content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_calls: Option<Vec<ToolCallOut>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_call_id: Option<String>,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct ToolCallOut {
        pub id: String,
        #[serde(rename = "type")]
        pub call_type: &'static str,
        pub function: FunctionCallOut,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionCallOut {
        pub name: String,
        /// JSON string of the arguments.
        pub arguments: String,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct Tool {
        #[serde(rename = "type")]
        pub tool_type: &'static str,
        pub function: FunctionDef,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionDef {
        pub name: String,
        pub description: String,
        pub parameters: JsonValue,
    }

    pub(super) fn build_request<'a>(model: &'a str, request: &ChatRequest) -> Request<'a> {
        let messages = request.messages.iter().map(convert_message).collect();
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| Tool {
                        tool_type: "function",
                        function: FunctionDef {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };
        let tool_choice = tools.as_ref().map(|_| "auto");
        Request {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools,
            tool_choice,
        }
    }

    fn convert_message(message: &ChatMessage) -> Message {
        let role = match message.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        };
        let tool_calls = message.tool_call.as_ref().map(|call| {
            vec![ToolCallOut {
                id: call.id.clone(),
                call_type: "function",
                function: FunctionCallOut {
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                },
            }]
        });
        Message {
            role,
            content: if message.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(message.content.clone())
            },
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    // ── Response types ─────────────────────────────────────────────

    #[derive(Debug, Deserialize)]
    pub(super) struct Response {
        pub choices: Vec<Choice>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Choice {
        pub message: ResponseMessage,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ResponseMessage {
        pub content: Option<String>,
        pub tool_calls: Option<Vec<ToolCallIn>>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ToolCallIn {
        pub id: Option<String>,
        pub function: FunctionCallIn,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct FunctionCallIn {
        pub name: String,
        pub arguments: String,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    pub(super) fn error_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|b| b.error.message)
    }

    pub(super) fn into_outcome(response: Response) -> Result<ChatOutcome, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "response carried no choices".to_string(),
            })?;

        if let Some(call) = choice
            .message
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
        {
            let arguments: JsonValue = serde_json::from_str(&call.function.arguments)
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: format!("tool call arguments are not valid JSON: {e}"),
                })?;
            let id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| InvocationId::new().to_string());
            return Ok(ChatOutcome::ToolCall(ToolInvocation {
                id,
                name: call.function.name,
                arguments,
            }));
        }

        Ok(ChatOutcome::Text(choice.message.content.unwrap_or_default()))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::backend::ToolSpec;
        use serde_json::json;

        #[test]
        fn request_serializes_tools_and_choice() {
            let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_tools(vec![
                ToolSpec {
                    name: "check_product_stock".to_string(),
                    description: "Check stock".to_string(),
                    parameters: json!({"type": "object"}),
                },
            ]);
            let wire = build_request("gpt-4o-mini", &request);
            let value = serde_json::to_value(&wire).expect("serialize");
            assert_eq!(value["tool_choice"], json!("auto"));
            assert_eq!(value["tools"][0]["type"], json!("function"));
            assert_eq!(
                value["tools"][0]["function"]["name"],
                json!("check_product_stock")
            );
        }

        #[test]
        fn request_without_tools_omits_choice() {
            let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
            let wire = build_request("gpt-4o-mini", &request);
            let value = serde_json::to_value(&wire).expect("serialize");
            assert!(value.get("tools").is_none());
            assert!(value.get("tool_choice").is_none());
        }

        #[test]
        fn assistant_tool_call_round_trips_as_json_string() {
            let invocation = ToolInvocation {
                id: "call_1".to_string(),
                name: "create_bill".to_string(),
                arguments: json!({"items": []}),
            };
            let request =
                ChatRequest::new(vec![ChatMessage::assistant_tool_call(invocation)]);
            let wire = build_request("gpt-4o-mini", &request);
            let value = serde_json::to_value(&wire).expect("serialize");
            let call = &value["messages"][0]["tool_calls"][0];
            assert_eq!(call["function"]["arguments"], json!("{\"items\":[]}"));
            assert!(value["messages"][0]["content"].is_null());
        }

        #[test]
        fn text_response_becomes_text_outcome() {
            let response: Response = serde_json::from_value(json!({
                "choices": [{"message": {"content": "Hello there"}}]
            }))
            .expect("deserialize");
            let outcome = into_outcome(response).expect("outcome");
            assert_eq!(outcome, ChatOutcome::Text("Hello there".to_string()));
        }

        #[test]
        fn tool_call_response_becomes_invocation() {
            let response: Response = serde_json::from_value(json!({
                "choices": [{"message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "check_product_stock",
                            "arguments": "{\"product_name\":\"Widget\"}"
                        }
                    }]
                }}]
            }))
            .expect("deserialize");
            match into_outcome(response).expect("outcome") {
                ChatOutcome::ToolCall(call) => {
                    assert_eq!(call.id, "call_abc");
                    assert_eq!(call.name, "check_product_stock");
                    assert_eq!(call.arguments["product_name"], json!("Widget"));
                }
                ChatOutcome::Text(_) => panic!("expected tool call"),
            }
        }

        #[test]
        fn malformed_arguments_fail_parse() {
            let response: Response = serde_json::from_value(json!({
                "choices": [{"message": {
                    "tool_calls": [{
                        "id": "call_abc",
                        "function": {"name": "x", "arguments": "not json"}
                    }]
                }}]
            }))
            .expect("deserialize");
            assert!(matches!(
                into_outcome(response),
                Err(LlmError::ResponseParseFailed { .. })
            ));
        }

        #[test]
        fn missing_call_id_gets_generated() {
            let response: Response = serde_json::from_value(json!({
                "choices": [{"message": {
                    "tool_calls": [{
                        "function": {"name": "x", "arguments": "{}"}
                    }]
                }}]
            }))
            .expect("deserialize");
            match into_outcome(response).expect("outcome") {
                ChatOutcome::ToolCall(call) => assert!(call.id.starts_with("call_")),
                ChatOutcome::Text(_) => panic!("expected tool call"),
            }
        }

        #[test]
        fn empty_choices_is_parse_failure() {
            let response: Response =
                serde_json::from_value(json!({"choices": []})).expect("deserialize");
            assert!(matches!(
                into_outcome(response),
                Err(LlmError::ResponseParseFailed { .. })
            ));
        }

        #[test]
        fn provider_error_body_is_extracted() {
            let body = "{\"error\": {\"message\": \"model overloaded\"}}";
            assert_eq!(error_message(body).as_deref(), Some("model overloaded"));
            assert!(error_message("<html>").is_none());
        }
    }
}
