//! Conversation session management.
//!
//! Sessions are identified by an opaque, client-supplied id and hold the
//! ordered message log for one conversation. The registry owns every live
//! session for the lifetime of the process; there is no persistence.

use crate::message::{Message, MessageRole};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A conversation session.
///
/// Invariant: the message log always begins with exactly one system-role
/// message. It is created as an empty placeholder and rewritten once, on
/// the session's first user turn, with the role-specific prompt and the
/// inventory snapshot. No message is ever removed except by reset.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identifier.
    pub id: String,
    /// Messages in this session, leading system message first.
    messages: Vec<Message>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last saw activity.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a fresh session with the mandatory system placeholder.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: vec![Message::system("")],
            created_at: now,
            last_active_at: now,
        }
    }

    /// Returns true if the system prompt has not been installed yet.
    #[must_use]
    pub fn needs_system_prompt(&self) -> bool {
        self.messages[0].content.is_empty()
    }

    /// Installs the system prompt, rewriting the leading placeholder.
    pub fn install_system_prompt(&mut self, content: impl Into<String>) {
        self.messages[0].content = content.into();
        self.last_active_at = Utc::now();
    }

    /// Appends a message to the log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.last_active_at = Utc::now();
    }

    /// The full message log, leading system message included.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent `limit` messages, system message excluded.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<Message> {
        let visible: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();
        let skip = visible.len().saturating_sub(limit);
        visible.into_iter().skip(skip).cloned().collect()
    }

    /// Returns the number of messages, system message included.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Shared handle to one session. Mutation serializes on the inner lock.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Registry of live sessions.
///
/// The outer lock guards only the map; each session carries its own async
/// lock so concurrent requests for the same id serialize while requests
/// for different ids proceed independently. Callers must not hold a
/// session lock across a model round-trip.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, creating it on first sight.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut sessions = self.lock_map();
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Session::new(id))))
            .clone()
    }

    /// Resets a session back to a single fresh system placeholder.
    ///
    /// Idempotent: unknown ids end up as fresh sessions, and resetting a
    /// fresh session is a no-op in effect.
    pub async fn reset(&self, id: &str) {
        let handle = self.get_or_create(id);
        let mut session = handle.lock().await;
        *session = Session::new(id);
    }

    /// Removes sessions idle since before `cutoff`. Returns how many were
    /// dropped. Sessions currently locked by a request are left alone.
    #[must_use]
    pub fn remove_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.lock_map();
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.last_active_at >= cutoff,
            Err(_) => true,
        });
        before - sessions.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_map().is_empty()
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionHandle>> {
        // Map operations never panic while holding the lock.
        self.sessions.lock().expect("session registry lock poisoned")
    }
}
