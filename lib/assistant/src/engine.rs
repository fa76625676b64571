//! The per-turn chat engine.
//!
//! One turn: append the user message, let the model decide, execute at
//! most one tool, synthesize the reply, append it. The session lock is
//! never held across a model round-trip, so slow providers stall only
//! their own turn.

use crate::dispatch::Dispatcher;
use crate::prompt;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use storefront_ai::{ChatMessage, ChatRole, Decision, ModelGateway, ToolSpec};
use storefront_conversation::{
    Message, MessageRole, SessionRegistry, catalog,
};
use storefront_domain::{ProductStore, User};

/// Reply used when the model produced neither text nor an invocation.
const NOT_SURE_REPLY: &str = "I'm not sure how to help with that.";

/// Options for the engine.
#[derive(Debug, Clone, Copy)]
pub struct AssistantOptions {
    /// Phrase tool results through a second model call instead of using
    /// the templated result text. Costs one extra round-trip per action.
    pub narrate_with_model: bool,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            narrate_with_model: false,
        }
    }
}

/// The assistant's answer for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Text for the user.
    pub response: String,
    /// The session the turn belongs to.
    pub session_id: String,
    /// Name of the tool that ran successfully this turn, if any.
    pub action_performed: Option<String>,
}

/// The conversational engine: sessions, gateway, dispatcher.
pub struct Assistant {
    registry: SessionRegistry,
    gateway: ModelGateway,
    dispatcher: Dispatcher,
    products: Arc<dyn ProductStore>,
    tools: Vec<ToolSpec>,
    options: AssistantOptions,
}

impl Assistant {
    /// Creates an engine over a gateway and dispatcher.
    #[must_use]
    pub fn new(
        gateway: ModelGateway,
        dispatcher: Dispatcher,
        products: Arc<dyn ProductStore>,
    ) -> Self {
        let tools = catalog()
            .into_iter()
            .map(|def| ToolSpec {
                name: def.name.as_str().to_string(),
                description: def.description,
                parameters: def.parameters,
            })
            .collect();
        Self {
            registry: SessionRegistry::new(),
            gateway,
            dispatcher,
            products,
            tools,
            options: AssistantOptions::default(),
        }
    }

    /// Overrides the engine options.
    #[must_use]
    pub fn with_options(mut self, options: AssistantOptions) -> Self {
        self.options = options;
        self
    }

    /// Handles one user turn.
    pub async fn chat(&self, session_id: &str, text: &str, actor: &User) -> ChatReply {
        let handle = self.registry.get_or_create(session_id);

        let history: Vec<ChatMessage> = {
            let mut session = handle.lock().await;
            if session.needs_system_prompt() {
                let store_context = match self.products.list().await {
                    Ok(products) => prompt::inventory_snapshot(&products),
                    Err(e) => {
                        tracing::warn!(error = %e, "could not snapshot inventory for prompt");
                        "Unable to fetch store inventory.".to_string()
                    }
                };
                session.install_system_prompt(prompt::system_prompt(actor.role, &store_context));
            }
            session.append(Message::user(text));
            session.messages().iter().map(to_chat_message).collect()
        };

        let decision = self.gateway.decide(&history, &self.tools).await;

        let (response, action_performed) = match decision {
            Decision::Reply(reply) => {
                let reply = if reply.trim().is_empty() {
                    NOT_SURE_REPLY.to_string()
                } else {
                    reply
                };
                (reply, None)
            }
            Decision::Invoke(invocation) => {
                tracing::info!(
                    tool = %invocation.name,
                    session = session_id,
                    "executing tool invocation"
                );
                let result = self
                    .dispatcher
                    .execute(&invocation.name, &invocation.arguments, actor)
                    .await;
                let action = result.success.then(|| invocation.name.clone());

                let reply = if self.options.narrate_with_model {
                    let result_json = serde_json::to_string(&result).unwrap_or_default();
                    self.gateway
                        .narrate(&history, &invocation, &result_json, result.user_text())
                        .await
                } else {
                    result.user_text().to_string()
                };
                (reply, action)
            }
        };

        {
            let mut session = handle.lock().await;
            session.append(Message::assistant(response.clone()));
        }

        ChatReply {
            response,
            session_id: session_id.to_string(),
            action_performed,
        }
    }

    /// Clears a session back to a fresh system placeholder.
    pub async fn reset_session(&self, session_id: &str) {
        self.registry.reset(session_id).await;
    }

    /// The most recent `limit` messages of a session, system excluded.
    pub async fn history(&self, session_id: &str, limit: usize) -> Vec<Message> {
        let handle = self.registry.get_or_create(session_id);
        let session = handle.lock().await;
        session.history(limit)
    }

    /// Evicts sessions idle since before `cutoff`.
    pub fn evict_idle_sessions(&self, cutoff: DateTime<Utc>) -> usize {
        self.registry.remove_idle(cutoff)
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    let role = match message.role {
        MessageRole::System => ChatRole::System,
        MessageRole::User => ChatRole::User,
        MessageRole::Assistant => ChatRole::Assistant,
        MessageRole::Tool => ChatRole::Tool,
    };
    ChatMessage {
        role,
        content: message.content.clone(),
        tool_call_id: message.tool_call_id.clone(),
        tool_call: None,
    }
}
