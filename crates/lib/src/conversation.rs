//! Ordered message log for one chat session.
//!
//! A log always starts with the template's welcome message, identified by [`WELCOME_ID`].
//! The welcome message is shown to the user but never forwarded to the backend.

use crate::llm::ChatMessage;
use crate::templates::TemplateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved id of the synthetic welcome message.
pub const WELCOME_ID: &str = "welcome";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The welcome message for a template.
    pub fn welcome(template: TemplateId) -> Self {
        Self {
            id: WELCOME_ID.to_string(),
            role: Role::Assistant,
            content: template.config().welcome_message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_ID
    }

    fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Message log of one session. Unbounded; no deduplication.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// A fresh log holding only the welcome message for `template`.
    pub fn new(template: TemplateId) -> Self {
        Self {
            messages: vec![Message::welcome(template)],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop everything and start over with the welcome message for `template`.
    pub fn reset(&mut self, template: TemplateId) {
        self.messages.clear();
        self.messages.push(Message::welcome(template));
    }

    /// Overwrite content and timestamp of the assistant message at `index`.
    /// No-op (returns false) when `index` is out of bounds or not an assistant message.
    pub fn replace_at(
        &mut self,
        index: usize,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> bool {
        match self.messages.get_mut(index) {
            Some(m) if m.role == Role::Assistant => {
                m.content = content.into();
                m.timestamp = timestamp;
                true
            }
            _ => false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Outbound history: every message except the welcome message.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history_before(self.messages.len())
    }

    /// Outbound history of the messages before `end` (welcome excluded).
    pub fn history_before(&self, end: usize) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .take(end)
            .filter(|m| !m.is_welcome())
            .map(Message::to_chat_message)
            .collect()
    }
}
