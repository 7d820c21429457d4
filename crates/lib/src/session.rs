//! Chat sessions keyed by id.
//!
//! Each session is an independent [`ChatSession`] (own log, scope and in-flight flag);
//! sessions share only the generator they call.

use crate::chat::ChatSession;
use crate::llm::{Generator, DEFAULT_MAX_TOKENS};
use crate::templates::TemplateId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Unique session identifier (opaque string).
pub type SessionId = String;

/// In-memory store for chat sessions (create, get, remove).
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<SessionId, Arc<ChatSession>>>>,
    generator: Arc<dyn Generator>,
    max_tokens: u32,
}

impl SessionStore {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self::with_max_tokens(generator, DEFAULT_MAX_TOKENS)
    }

    pub fn with_max_tokens(generator: Arc<dyn Generator>, max_tokens: u32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            generator,
            max_tokens,
        }
    }

    /// Create a new session for `template` with a generated id; returns the session id.
    pub async fn create(&self, template: TemplateId) -> SessionId {
        let id = format!("sess-{}", uuid::Uuid::new_v4());
        let session = ChatSession::with_max_tokens(template, self.generator.clone(), self.max_tokens);
        self.inner.write().await.insert(id.clone(), Arc::new(session));
        log::debug!("session: created {} ({})", id, template);
        id
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ChatSession>> {
        self.inner.read().await.get(id).cloned()
    }

    /// Remove a session. A call still in flight on it completes against the detached session.
    pub async fn remove(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
